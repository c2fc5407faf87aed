// tests/pipeline_scenarios.rs
//! End-to-end runs over mocked collaborators: one paper in, one paper out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use arxiv_digest::config::{InferenceConfig, SearchConfig};
use arxiv_digest::inference::backend::{
    BatchHandle, BatchSnapshot, InferenceBackend, JobState,
};
use arxiv_digest::inference::request::StructuredRequest;
use arxiv_digest::{
    App, Notifier, Outcome, Paper, PaperNotification, PaperSource, Pipeline, PipelineError,
    PromptSet, RunStatus, SchemaKind, SearchQuery, Stage,
};

fn paper(n: u32) -> Paper {
    Paper {
        id: format!("https://arxiv.org/abs/2503.0000{n}v1"),
        title: format!("Paper {n}"),
        abstract_text: format!("Abstract of paper {n}."),
        authors: vec!["A. Author".into(), "B. Coauthor".into()],
        categories: vec!["math.AG".into()],
        submitted_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

fn sequential_cfg() -> InferenceConfig {
    InferenceConfig {
        api_key: "test".into(),
        filter_model: "filter-model".into(),
        summary_model: "summary-model".into(),
        use_batch: false,
        batch_min_items: 4,
        poll_interval_secs: 1,
        max_wait_secs: 5,
        sequential_delay_secs: 0,
    }
}

fn prompts() -> PromptSet {
    PromptSet {
        check_interest: "Decide.".into(),
        summarize: "Summarize.".into(),
    }
}

// ---- two-paper scenario: only the interesting one is delivered ----

struct TwoPaperSource;

#[async_trait]
impl PaperSource for TwoPaperSource {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<Paper>> {
        Ok(vec![paper(1), paper(2)])
    }
    fn name(&self) -> &'static str {
        "two-paper"
    }
}

struct ScriptBackend {
    interest: Mutex<VecDeque<String>>,
    summary: Mutex<VecDeque<String>>,
}

#[async_trait]
impl InferenceBackend for ScriptBackend {
    async fn create_batch(
        &self,
        _model: &str,
        _display_name: &str,
        _requests: &[StructuredRequest],
    ) -> Result<BatchHandle> {
        Err(anyhow!("batch disabled in this test"))
    }
    async fn poll_batch(&self, _job_id: &str) -> Result<BatchSnapshot> {
        Err(anyhow!("batch disabled in this test"))
    }
    async fn generate(&self, _model: &str, request: &StructuredRequest) -> Result<String> {
        let queue = match request.schema {
            SchemaKind::InterestCheck => &self.interest,
            SchemaKind::Summary => &self.summary,
        };
        queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
    records: Mutex<Vec<PaperNotification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_notice(&self, text: &str) -> Result<()> {
        self.notices.lock().unwrap().push(text.to_string());
        Ok(())
    }
    async fn send_paper(&self, record: &PaperNotification) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recording"
    }
}

#[tokio::test]
async fn interesting_paper_is_summarized_and_delivered() {
    let backend = Arc::new(ScriptBackend {
        interest: Mutex::new(
            vec![
                r#"{"interested_in":true}"#.to_string(),
                r#"{"interested_in":false}"#.to_string(),
            ]
            .into(),
        ),
        summary: Mutex::new(
            vec![r#"{"title":"A","summary":"B","keywords":["x","y"]}"#.to_string()].into(),
        ),
    });
    let notifier = Arc::new(RecordingNotifier::default());

    let app = App::new(
        Box::new(TwoPaperSource),
        SearchConfig::default(),
        Pipeline::new(backend, sequential_cfg(), prompts()),
        Box::new(ArcNotifier(notifier.clone())),
        Duration::ZERO,
    );

    let status = app.run_once().await.unwrap();
    assert!(status.is_success());
    assert_eq!(status, RunStatus::Delivered(arxiv_digest::DeliveryReport { sent: 2, failed: 0 }));

    let notices = notifier.notices.lock().unwrap();
    assert_eq!(notices.as_slice(), ["1 interesting papers found"]);

    let records = notifier.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.title, "A");
    assert_eq!(record.summary, "B");
    assert_eq!(record.keywords, "x, y");
    assert!(record.appendix.is_none());
    assert_eq!(record.url, paper(1).id);
    assert_eq!(record.authors, "A. Author, B. Coauthor");
}

/// Adapter so a test can keep a handle on the notifier it hands to the app.
struct ArcNotifier(Arc<RecordingNotifier>);

#[async_trait]
impl Notifier for ArcNotifier {
    async fn send_notice(&self, text: &str) -> Result<()> {
        self.0.send_notice(text).await
    }
    async fn send_paper(&self, record: &PaperNotification) -> Result<()> {
        self.0.send_paper(record).await
    }
    fn name(&self) -> &'static str {
        self.0.name()
    }
}

// ---- interest-stage job failure aborts before summarization ----

struct FailingBatchBackend {
    summary_batches: AtomicUsize,
}

#[async_trait]
impl InferenceBackend for FailingBatchBackend {
    async fn create_batch(
        &self,
        _model: &str,
        _display_name: &str,
        requests: &[StructuredRequest],
    ) -> Result<BatchHandle> {
        if requests.iter().any(|r| r.schema == SchemaKind::Summary) {
            self.summary_batches.fetch_add(1, Ordering::SeqCst);
        }
        Ok(BatchHandle {
            id: "batches/doomed".into(),
            state: JobState::Submitted,
        })
    }
    async fn poll_batch(&self, _job_id: &str) -> Result<BatchSnapshot> {
        Ok(BatchSnapshot {
            state: JobState::Failed,
            results: None,
        })
    }
    async fn generate(&self, _model: &str, _request: &StructuredRequest) -> Result<String> {
        Err(anyhow!("sequential path disabled in this test"))
    }
}

#[tokio::test]
async fn interest_job_failure_aborts_the_run() {
    let backend = Arc::new(FailingBatchBackend {
        summary_batches: AtomicUsize::new(0),
    });
    let cfg = InferenceConfig {
        use_batch: true,
        batch_min_items: 1,
        ..sequential_cfg()
    };
    let pipeline = Pipeline::new(backend.clone(), cfg, prompts());

    let err = pipeline.run(&[paper(1), paper(2)]).await.unwrap_err();
    match err {
        PipelineError::JobFailed { stage, state, .. } => {
            assert_eq!(stage, Stage::InterestCheck);
            assert_eq!(state, JobState::Failed);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // no summarization request was ever built or submitted
    assert_eq!(backend.summary_batches.load(Ordering::SeqCst), 0);
}

// ---- empty pipeline outcome sanity ----

#[tokio::test]
async fn all_uninteresting_short_circuits_with_success() {
    let backend = Arc::new(ScriptBackend {
        interest: Mutex::new(
            vec![
                r#"{"interested_in":false}"#.to_string(),
                r#"{"interested_in":false}"#.to_string(),
            ]
            .into(),
        ),
        summary: Mutex::new(VecDeque::new()),
    });
    let pipeline = Pipeline::new(backend, sequential_cfg(), prompts());
    let outcome = pipeline.run(&[paper(1), paper(2)]).await.unwrap();
    assert_eq!(outcome, Outcome::NothingInteresting);
}
