// src/app.rs
//! Glue for one full run: search, pipeline, delivery. Collaborators are
//! constructed once at startup and injected, so tests can swap any of them.

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::config::SearchConfig;
use crate::notify::{dispatch, DeliveryReport, Notifier, PaperNotification};
use crate::pipeline::{Outcome, Pipeline, PipelineError};
use crate::search::types::{PaperSource, SearchQuery};
use crate::search::run_search;

/// How a single run ended. Every variant except a failed delivery maps to a
/// zero exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NoPapers,
    NothingInteresting,
    Delivered(DeliveryReport),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        match self {
            RunStatus::NoPapers | RunStatus::NothingInteresting => true,
            RunStatus::Delivered(report) => report.all_delivered(),
        }
    }
}

pub struct App {
    source: Box<dyn PaperSource>,
    search_cfg: SearchConfig,
    pipeline: Pipeline,
    notifier: Box<dyn Notifier>,
    pacing: Duration,
}

impl App {
    pub fn new(
        source: Box<dyn PaperSource>,
        search_cfg: SearchConfig,
        pipeline: Pipeline,
        notifier: Box<dyn Notifier>,
        pacing: Duration,
    ) -> Self {
        Self {
            source,
            search_cfg,
            pipeline,
            notifier,
            pacing,
        }
    }

    pub async fn run_once(&self) -> Result<RunStatus, PipelineError> {
        let query = SearchQuery::daily(
            self.search_cfg.categories.clone(),
            self.search_cfg.max_results,
            Utc::now(),
        );
        let papers = run_search(self.source.as_ref(), &query)
            .await
            .map_err(PipelineError::Search)?;
        if papers.is_empty() {
            info!("no papers found");
            return Ok(RunStatus::NoPapers);
        }
        info!(count = papers.len(), "papers found");

        match self.pipeline.run(&papers).await? {
            Outcome::NothingInteresting => {
                info!("no interesting papers found");
                Ok(RunStatus::NothingInteresting)
            }
            Outcome::Ready { interesting, pairs } => {
                let now = Utc::now();
                let records: Vec<PaperNotification> = pairs
                    .iter()
                    .map(|(paper, summary)| PaperNotification::from_pair(paper, summary, now))
                    .collect();
                let report =
                    dispatch(self.notifier.as_ref(), interesting, &records, self.pacing).await;
                Ok(RunStatus::Delivered(report))
            }
        }
    }
}
