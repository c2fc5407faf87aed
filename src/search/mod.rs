// src/search/mod.rs
pub mod arxiv;
pub mod types;

use chrono::{DateTime, Duration, Timelike, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

use crate::search::types::{Paper, PaperSource, SearchQuery};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_papers_total", "Papers returned by the index.");
        describe_counter!("search_errors_total", "Index query failures.");
        describe_histogram!("search_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip markup, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip stray markup (arXiv abstracts occasionally carry tags)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (abstracts arrive hard-wrapped)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 4) Length cap: 4000 chars
    if out.chars().count() > 4000 {
        out = out.chars().take(4000).collect();
    }

    out
}

/// The submission window for a daily run: the full UTC day that started two
/// days before `now`. The index lags behind real submissions, so querying
/// "yesterday" directly returns a mostly empty window.
pub fn submission_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day_start = (now - Duration::days(2))
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now - Duration::days(2));
    (day_start, day_start + Duration::days(1))
}

/// Timestamp format the index expects in `submittedDate` ranges.
pub fn format_window_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d%H%M").to_string()
}

impl SearchQuery {
    /// Query for the standard daily window ending relative to `now`.
    pub fn daily(categories: Vec<String>, max_results: u32, now: DateTime<Utc>) -> Self {
        let (window_start, window_end) = submission_window(now);
        Self {
            categories,
            window_start,
            window_end,
            max_results,
        }
    }
}

/// Run one search through the provider, with telemetry.
pub async fn run_search(provider: &dyn PaperSource, query: &SearchQuery) -> anyhow::Result<Vec<Paper>> {
    ensure_metrics_described();

    tracing::info!(
        provider = provider.name(),
        categories = ?query.categories,
        from = %query.window_start,
        to = %query.window_end,
        "searching papers"
    );
    match provider.search(query).await {
        Ok(papers) => {
            counter!("search_papers_total").increment(papers.len() as u64);
            Ok(papers)
        }
        Err(e) => {
            counter!("search_errors_total").increment(1);
            Err(e)
        }
    }
}
