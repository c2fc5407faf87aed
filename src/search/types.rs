// src/search/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One paper as returned by the index. Immutable for the rest of the run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Paper {
    /// Permanent abstract URL, e.g. "https://arxiv.org/abs/2501.01234v1".
    pub id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Category filter plus submission-date window, already resolved to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub categories: Vec<String>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub max_results: u32,
}

#[async_trait::async_trait]
pub trait PaperSource: Send + Sync {
    /// Papers matching the query, sorted by submission time descending.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>>;
    fn name(&self) -> &'static str;
}
