// src/inference/batch.rs
//! Batch client: submit the whole stage as one job, then poll at a fixed
//! interval until the provider reports a terminal state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::info;

use crate::inference::backend::{BatchSnapshot, InferenceBackend, JobState};
use crate::inference::request::StructuredRequest;

/// Process-local handle for one submitted job. Mutated only by polling,
/// discarded at the end of the run.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    submitted: usize,
    results: Option<Vec<Option<String>>>,
}

impl BatchJob {
    fn apply(&mut self, snapshot: BatchSnapshot) {
        self.state = snapshot.state;
        if let Some(results) = snapshot.results {
            self.results = Some(results);
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted
    }
}

#[derive(Debug, Error)]
pub enum BatchWaitError {
    #[error("batch job {job_id} still {state} after {elapsed_secs}s (limit {limit_secs}s)")]
    Timeout {
        job_id: String,
        state: JobState,
        elapsed_secs: u64,
        limit_secs: u64,
    },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct BatchJobClient {
    backend: Arc<dyn InferenceBackend>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl BatchJobClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, poll_interval: Duration, max_wait: Duration) -> Self {
        super::ensure_metrics_described();
        Self {
            backend,
            poll_interval,
            max_wait,
        }
    }

    /// Submit all requests as one network operation. An empty request list
    /// never reaches the network: it yields an already-terminal empty job.
    pub async fn submit(
        &self,
        model: &str,
        display_name: &str,
        requests: &[StructuredRequest],
    ) -> Result<BatchJob> {
        if requests.is_empty() {
            return Ok(BatchJob {
                id: "local/empty".to_string(),
                state: JobState::Succeeded,
                created_at: Utc::now(),
                submitted: 0,
                results: Some(Vec::new()),
            });
        }

        let handle = self.backend.create_batch(model, display_name, requests).await?;
        counter!("inference_batch_jobs_total").increment(1);
        info!(job_id = %handle.id, items = requests.len(), model, "batch job created");
        Ok(BatchJob {
            id: handle.id,
            state: handle.state,
            created_at: Utc::now(),
            submitted: requests.len(),
            results: None,
        })
    }

    /// One status round trip.
    pub async fn poll(&self, job: &mut BatchJob) -> Result<()> {
        let snapshot = self.backend.poll_batch(&job.id).await?;
        job.apply(snapshot);
        Ok(())
    }

    /// Sleep the poll interval, poll, repeat until the job is terminal or the
    /// wait limit is exceeded. Elapsed wall-clock time is logged on every
    /// iteration so an operator can spot a stuck job.
    pub async fn await_completion(&self, mut job: BatchJob) -> Result<BatchJob, BatchWaitError> {
        let started = Instant::now();
        while !job.state.is_terminal() {
            if started.elapsed() >= self.max_wait {
                return Err(BatchWaitError::Timeout {
                    job_id: job.id,
                    state: job.state,
                    elapsed_secs: started.elapsed().as_secs(),
                    limit_secs: self.max_wait.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            self.poll(&mut job).await?;
            counter!("inference_poll_iterations_total").increment(1);
            info!(
                job_id = %job.id,
                state = %job.state,
                elapsed_secs = started.elapsed().as_secs(),
                "batch job poll"
            );
        }
        histogram!("inference_batch_wait_secs").record(started.elapsed().as_secs_f64());
        info!(
            job_id = %job.id,
            state = %job.state,
            elapsed_secs = started.elapsed().as_secs(),
            "batch job reached terminal state"
        );
        Ok(job)
    }

    /// Per-slot payloads, index-aligned with the submitted requests. The
    /// provider may return fewer slots than were submitted; missing tail
    /// slots read as absent.
    pub fn fetch_results(&self, job: &BatchJob) -> Vec<Option<String>> {
        let mut out = job.results.clone().unwrap_or_default();
        out.truncate(job.submitted);
        out.resize(job.submitted, None);
        out
    }
}
