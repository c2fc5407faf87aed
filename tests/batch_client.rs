// tests/batch_client.rs
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use arxiv_digest::inference::backend::{BatchHandle, BatchSnapshot, InferenceBackend, JobState};
use arxiv_digest::inference::batch::{BatchJobClient, BatchWaitError};
use arxiv_digest::inference::request::{GenerationHints, StructuredRequest};
use arxiv_digest::SchemaKind;

/// Replays a scripted sequence of poll snapshots; the last one repeats.
struct ScriptedBackend {
    creates: AtomicUsize,
    polls: AtomicUsize,
    script: Mutex<VecDeque<BatchSnapshot>>,
}

impl ScriptedBackend {
    fn new(script: Vec<BatchSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            creates: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        })
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn create_batch(
        &self,
        _model: &str,
        _display_name: &str,
        _requests: &[StructuredRequest],
    ) -> Result<BatchHandle> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(BatchHandle {
            id: "batches/test".into(),
            state: JobState::Submitted,
        })
    }

    async fn poll_batch(&self, _job_id: &str) -> Result<BatchSnapshot> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            Ok(script.pop_front().unwrap())
        } else {
            script
                .front()
                .cloned()
                .ok_or_else(|| anyhow!("script exhausted"))
        }
    }

    async fn generate(&self, _model: &str, _request: &StructuredRequest) -> Result<String> {
        Err(anyhow!("not used in batch tests"))
    }
}

fn req(prompt: &str) -> StructuredRequest {
    StructuredRequest {
        prompt: prompt.into(),
        schema: SchemaKind::InterestCheck,
        hints: GenerationHints::default(),
    }
}

fn running() -> BatchSnapshot {
    BatchSnapshot {
        state: JobState::Running,
        results: None,
    }
}

fn client(backend: Arc<ScriptedBackend>, max_wait_ms: u64) -> BatchJobClient {
    BatchJobClient::new(
        backend,
        Duration::from_millis(1),
        Duration::from_millis(max_wait_ms),
    )
}

#[tokio::test]
async fn polls_until_terminal_and_preserves_slot_order() {
    let backend = ScriptedBackend::new(vec![
        running(),
        running(),
        BatchSnapshot {
            state: JobState::Succeeded,
            results: Some(vec![Some("a".into()), None, Some("c".into())]),
        },
    ]);
    let client = client(backend.clone(), 5_000);

    let requests = vec![req("p1"), req("p2"), req("p3")];
    let job = client.submit("model", "job", &requests).await.unwrap();
    let job = client.await_completion(job).await.unwrap();

    assert_eq!(job.state, JobState::Succeeded);
    assert!(backend.polls.load(Ordering::SeqCst) >= 3);

    let slots = client.fetch_results(&job);
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].as_deref(), Some("a"));
    assert!(slots[1].is_none());
    assert_eq!(slots[2].as_deref(), Some("c"));
}

#[tokio::test]
async fn whole_job_failure_comes_back_as_terminal_state() {
    let backend = ScriptedBackend::new(vec![BatchSnapshot {
        state: JobState::Failed,
        results: None,
    }]);
    let client = client(backend, 5_000);

    let job = client.submit("model", "job", &[req("p1")]).await.unwrap();
    let job = client.await_completion(job).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
}

#[tokio::test]
async fn empty_submit_never_touches_the_network() {
    let backend = ScriptedBackend::new(vec![]);
    let client = client(backend.clone(), 5_000);

    let job = client.submit("model", "job", &[]).await.unwrap();
    assert_eq!(job.state, JobState::Succeeded);
    assert!(client.fetch_results(&job).is_empty());
    assert_eq!(backend.creates.load(Ordering::SeqCst), 0);
    assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stuck_job_times_out_instead_of_polling_forever() {
    let backend = ScriptedBackend::new(vec![running()]);
    let client = client(backend, 20);

    let job = client.submit("model", "job", &[req("p1")]).await.unwrap();
    let err = client.await_completion(job).await.unwrap_err();
    assert!(matches!(err, BatchWaitError::Timeout { .. }));
}
