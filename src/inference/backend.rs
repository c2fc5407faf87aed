// src/inference/backend.rs
use std::fmt;

use anyhow::Result;

use crate::inference::request::StructuredRequest;

/// Lifecycle of a provider-side batch job. `Submitted` and `Running` are the
/// only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Expired,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled | JobState::Expired
        )
    }

    /// Map the provider's state string. Unknown strings are treated as still
    /// running so the poll loop keeps going until a recognizable terminal
    /// state (or the wait limit) is reached.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "JOB_STATE_PENDING" | "JOB_STATE_QUEUED" => JobState::Submitted,
            "JOB_STATE_RUNNING" => JobState::Running,
            "JOB_STATE_SUCCEEDED" => JobState::Succeeded,
            "JOB_STATE_FAILED" => JobState::Failed,
            "JOB_STATE_CANCELLED" => JobState::Cancelled,
            "JOB_STATE_EXPIRED" => JobState::Expired,
            _ => JobState::Running,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Submitted => "submitted",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
            JobState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// What `create_batch` hands back: the provider's job name plus its state.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    pub id: String,
    pub state: JobState,
}

/// One status round trip. `results` is populated only once the job has
/// succeeded; a `None` slot inside it means the provider returned nothing
/// for that item.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    pub state: JobState,
    pub results: Option<Vec<Option<String>>>,
}

/// Low-level provider boundary. Separated from the batch/sequential clients
/// so tests can script it.
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Submit all requests as one job. One network operation.
    async fn create_batch(
        &self,
        model: &str,
        display_name: &str,
        requests: &[StructuredRequest],
    ) -> Result<BatchHandle>;

    /// One status query; never blocks beyond a single round trip.
    async fn poll_batch(&self, job_id: &str) -> Result<BatchSnapshot>;

    /// Synchronous single-request call; returns the raw payload text.
    async fn generate(&self, model: &str, request: &StructuredRequest) -> Result<String>;
}
