// src/pipeline.rs
//! Two-stage orchestrator: interest filter, then summarization, each run
//! through the batch client or the sequential fallback. Slot output is kept
//! index-aligned with the papers that produced it, so the interest mask can
//! be applied positionally.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::InferenceConfig;
use crate::inference::backend::{InferenceBackend, JobState};
use crate::inference::batch::{BatchJobClient, BatchWaitError};
use crate::inference::decode::{decode_interest, decode_slots, decode_summary};
use crate::inference::request::{build_request, BuildError, GenerationHints, StructuredRequest};
use crate::inference::schema::{SchemaKind, Summary};
use crate::inference::sequential::SequentialFallbackClient;
use crate::search::types::Paper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InterestCheck,
    Summarize,
}

impl Stage {
    fn display_name(&self) -> &'static str {
        match self {
            Stage::InterestCheck => "Interest Check Batch Job",
            Stage::Summarize => "Summarize Paper Batch Job",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::InterestCheck => f.write_str("interest-check"),
            Stage::Summarize => f.write_str("summarize"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("paper search failed")]
    Search(#[source] anyhow::Error),
    #[error("{stage} stage: {source}")]
    MalformedPaper {
        stage: Stage,
        #[source]
        source: BuildError,
    },
    #[error("{stage} batch job {job_id} ended in state {state}")]
    JobFailed {
        stage: Stage,
        job_id: String,
        state: JobState,
    },
    #[error("{stage} stage timed out")]
    JobTimeout {
        stage: Stage,
        #[source]
        source: BatchWaitError,
    },
    #[error("{stage} stage backend error")]
    Backend {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

/// Instruction templates for the two stages. Content lives under `prompts/`.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub check_interest: String,
    pub summarize: String,
}

impl PromptSet {
    pub fn builtin() -> Self {
        Self {
            check_interest: include_str!("../prompts/check_interest.txt").to_string(),
            summarize: include_str!("../prompts/summarize.txt").to_string(),
        }
    }
}

/// What a run produced. Summaries whose slot came back absent or
/// undecodable are already dropped from `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NothingInteresting,
    Ready {
        /// How many papers passed the interest filter (the notice count);
        /// `pairs` may be shorter when summary slots came back unusable.
        interesting: usize,
        pairs: Vec<(Paper, Summary)>,
    },
}

pub struct Pipeline {
    batch: BatchJobClient,
    sequential: SequentialFallbackClient,
    cfg: InferenceConfig,
    prompts: PromptSet,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn InferenceBackend>, cfg: InferenceConfig, prompts: PromptSet) -> Self {
        let batch = BatchJobClient::new(
            backend.clone(),
            Duration::from_secs(cfg.poll_interval_secs),
            Duration::from_secs(cfg.max_wait_secs),
        );
        let sequential =
            SequentialFallbackClient::new(backend, Duration::from_secs(cfg.sequential_delay_secs));
        Self {
            batch,
            sequential,
            cfg,
            prompts,
        }
    }

    pub async fn run(&self, papers: &[Paper]) -> Result<Outcome, PipelineError> {
        // Stage 1: interest filter over every paper.
        let requests = self.build_requests(papers, Stage::InterestCheck)?;
        let slots = self
            .run_stage(Stage::InterestCheck, &self.cfg.filter_model, &requests)
            .await?;
        let checks = decode_slots("interest-check", &slots, decode_interest);

        // An absent or undecodable interest signal counts as "not interested".
        let mask: Vec<bool> = checks
            .iter()
            .map(|c| c.map(|v| v.interested_in).unwrap_or(false))
            .collect();
        let survivors: Vec<Paper> = papers
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(p, _)| p.clone())
            .collect();
        info!(
            total = papers.len(),
            interesting = survivors.len(),
            "interest filter applied"
        );
        counter!("pipeline_papers_filtered_total")
            .increment((papers.len() - survivors.len()) as u64);

        if survivors.is_empty() {
            return Ok(Outcome::NothingInteresting);
        }

        // Stage 2: summaries for the survivors only.
        let requests = self.build_requests(&survivors, Stage::Summarize)?;
        let slots = self
            .run_stage(Stage::Summarize, &self.cfg.summary_model, &requests)
            .await?;
        let summaries = decode_slots("summarize", &slots, decode_summary);

        let interesting = survivors.len();
        let mut pairs = Vec::with_capacity(interesting);
        for (index, (paper, summary)) in survivors.into_iter().zip(summaries).enumerate() {
            match summary {
                Some(summary) => pairs.push((paper, summary)),
                None => {
                    warn!(index, id = %paper.id, "dropping paper without a usable summary");
                }
            }
        }
        Ok(Outcome::Ready { interesting, pairs })
    }

    fn build_requests(
        &self,
        papers: &[Paper],
        stage: Stage,
    ) -> Result<Vec<StructuredRequest>, PipelineError> {
        let (template, schema, hints) = match stage {
            Stage::InterestCheck => (
                self.prompts.check_interest.as_str(),
                SchemaKind::InterestCheck,
                GenerationHints::default(),
            ),
            Stage::Summarize => (
                self.prompts.summarize.as_str(),
                SchemaKind::Summary,
                GenerationHints::low_thinking(),
            ),
        };
        papers
            .iter()
            .map(|paper| {
                build_request(paper, template, schema, hints.clone())
                    .map_err(|source| PipelineError::MalformedPaper { stage, source })
            })
            .collect()
    }

    /// One stage through either path. Batch is used when enabled and the
    /// input is large enough to be worth a job; otherwise each item goes
    /// through the sequential fallback.
    async fn run_stage(
        &self,
        stage: Stage,
        model: &str,
        requests: &[StructuredRequest],
    ) -> Result<Vec<Option<String>>, PipelineError> {
        if !self.use_batch_for(requests.len()) {
            info!(%stage, items = requests.len(), "running stage sequentially");
            return Ok(self.sequential.run(model, requests).await);
        }

        info!(%stage, items = requests.len(), "running stage as a batch job");
        let job = self
            .batch
            .submit(model, stage.display_name(), requests)
            .await
            .map_err(|source| PipelineError::Backend { stage, source })?;
        let job = match self.batch.await_completion(job).await {
            Ok(job) => job,
            Err(e @ BatchWaitError::Timeout { .. }) => {
                return Err(PipelineError::JobTimeout { stage, source: e })
            }
            Err(BatchWaitError::Transport(source)) => {
                return Err(PipelineError::Backend { stage, source })
            }
        };
        match job.state {
            JobState::Succeeded => Ok(self.batch.fetch_results(&job)),
            state => Err(PipelineError::JobFailed {
                stage,
                job_id: job.id,
                state,
            }),
        }
    }

    fn use_batch_for(&self, items: usize) -> bool {
        self.cfg.use_batch && items >= self.cfg.batch_min_items
    }
}
