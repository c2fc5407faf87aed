// src/search/arxiv.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::search::types::{Paper, PaperSource, SearchQuery};
use crate::search::{format_window_timestamp, normalize_text};

const EXPORT_API_BASE: &str = "https://export.arxiv.org";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: Option<String>,
}

fn parse_rfc3339_to_utc(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub struct ArxivProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base: String,
        client: reqwest::Client,
    },
}

impl ArxivProvider {
    pub fn new() -> Self {
        Self::from_base(EXPORT_API_BASE)
    }

    pub fn from_base(base: impl Into<String>) -> Self {
        let client = reqwest::Client::new();
        Self {
            mode: Mode::Http {
                base: base.into(),
                client,
            },
        }
    }

    /// Parse a canned Atom document instead of calling the network.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    /// `(cat:A OR cat:B) AND submittedDate:[start TO end]`
    fn build_search_query(query: &SearchQuery) -> String {
        let cats = query
            .categories
            .iter()
            .map(|c| format!("cat:{c}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "({cats}) AND submittedDate:[{} TO {}]",
            format_window_timestamp(query.window_start),
            format_window_timestamp(query.window_end),
        )
    }

    fn parse_feed(s: &str) -> Result<Vec<Paper>> {
        let t0 = std::time::Instant::now();
        let feed: Feed = from_str(s).context("parsing arxiv atom feed")?;

        let mut out = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            let title = normalize_text(entry.title.as_deref().unwrap_or_default());
            let abstract_text = normalize_text(entry.summary.as_deref().unwrap_or_default());
            let Some(id) = entry.id else {
                continue;
            };
            if title.is_empty() && abstract_text.is_empty() {
                continue;
            }

            out.push(Paper {
                id,
                title,
                abstract_text,
                authors: entry
                    .authors
                    .into_iter()
                    .filter_map(|a| a.name)
                    .collect(),
                categories: entry
                    .categories
                    .into_iter()
                    .filter_map(|c| c.term)
                    .collect(),
                submitted_at: entry
                    .published
                    .as_deref()
                    .map(parse_rfc3339_to_utc)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("search_parse_ms").record(ms);
        Ok(out)
    }
}

impl Default for ArxivProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperSource for ArxivProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_feed(s),

            Mode::Http { base, client } => {
                let url = format!("{base}/api/query");
                let body = client
                    .get(&url)
                    .query(&[
                        ("search_query", Self::build_search_query(query).as_str()),
                        ("max_results", query.max_results.to_string().as_str()),
                        ("sortBy", "submittedDate"),
                        ("sortOrder", "descending"),
                    ])
                    .send()
                    .await
                    .context("arxiv http get()")?
                    .error_for_status()
                    .context("arxiv non-2xx")?
                    .text()
                    .await
                    .context("arxiv http .text()")?;
                match Self::parse_feed(&body) {
                    Ok(papers) => Ok(papers),
                    Err(e) => {
                        counter!("search_errors_total").increment(1);
                        Err(e)
                    }
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "arxiv"
    }
}
