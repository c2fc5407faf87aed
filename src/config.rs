// src/config.rs
//! Typed configuration, loaded from `config/digest.toml`. Secret-bearing
//! fields accept the sentinel `"ENV"` and resolve from the environment at
//! load time, so the file itself can be committed.

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

fn default_interval_secs() -> u64 {
    86_400
}
fn default_categories() -> Vec<String> {
    vec!["math.AG".to_string(), "math.CO".to_string()]
}
fn default_max_results() -> u32 {
    20
}
fn default_filter_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_summary_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_use_batch() -> bool {
    true
}
fn default_batch_min_items() -> usize {
    4
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_max_wait_secs() -> u64 {
    3_600
}
fn default_sequential_delay_secs() -> u64 {
    30
}
fn default_pacing_ms() -> u64 {
    1_500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub inference: InferenceConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// false: run once and exit; true: keep running on `interval_secs`.
    #[serde(default)]
    pub daemon: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            daemon: false,
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// "ENV" means: read from GEMINI_API_KEY.
    pub api_key: String,
    #[serde(default = "default_filter_model")]
    pub filter_model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_use_batch")]
    pub use_batch: bool,
    /// Inputs smaller than this take the sequential path even when batch
    /// mode is enabled; a job is not worth the queueing for a handful of
    /// requests.
    #[serde(default = "default_batch_min_items")]
    pub batch_min_items: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_sequential_delay_secs")]
    pub sequential_delay_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// One-shot post through an outgoing webhook.
    Webhook,
    /// Channel messages through an authenticated bot session.
    Bot,
}

impl Default for NotifyMode {
    fn default() -> Self {
        NotifyMode::Webhook
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub mode: NotifyMode,
    /// "ENV" means: read from DIGEST_WEBHOOK_URL. Unset falls back to the
    /// same variable.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// "ENV" means: read from DISCORD_BOT_TOKEN.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// "ENV" means: read from DIGEST_CHANNEL_ID.
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            mode: NotifyMode::default(),
            webhook_url: None,
            bot_token: None,
            channel_id: None,
            pacing_ms: default_pacing_ms(),
        }
    }
}

fn resolve_secret(value: &mut Option<String>, var: &str) -> anyhow::Result<()> {
    match value {
        Some(v) if v.trim().eq_ignore_ascii_case("env") => {
            *value = Some(
                env::var(var).map_err(|_| anyhow::anyhow!("Missing {var} env var"))?,
            );
        }
        None => {
            *value = env::var(var).ok();
        }
        Some(_) => {}
    }
    Ok(())
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AppConfig = toml::from_str(&data)?;
        cfg.resolve_env()?;
        cfg.sanitize();
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_env(&mut self) -> anyhow::Result<()> {
        if self.inference.api_key.trim().eq_ignore_ascii_case("env") {
            self.inference.api_key = env::var("GEMINI_API_KEY")
                .map_err(|_| anyhow::anyhow!("Missing GEMINI_API_KEY env var"))?;
        }
        resolve_secret(&mut self.notify.webhook_url, "DIGEST_WEBHOOK_URL")?;
        resolve_secret(&mut self.notify.bot_token, "DISCORD_BOT_TOKEN")?;
        resolve_secret(&mut self.notify.channel_id, "DIGEST_CHANNEL_ID")?;
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.search.max_results == 0 {
            self.search.max_results = default_max_results();
        }
        if self.inference.poll_interval_secs == 0 {
            self.inference.poll_interval_secs = default_poll_interval_secs();
        }
        if self.inference.max_wait_secs < self.inference.poll_interval_secs {
            self.inference.max_wait_secs =
                default_max_wait_secs().max(self.inference.poll_interval_secs);
        }
        if self.run.interval_secs == 0 {
            self.run.interval_secs = default_interval_secs();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.search.categories.is_empty() {
            anyhow::bail!("search.categories must name at least one category");
        }
        match self.notify.mode {
            NotifyMode::Webhook if self.notify.webhook_url.is_none() => {
                anyhow::bail!("notify.webhook_url missing (set it or DIGEST_WEBHOOK_URL)")
            }
            NotifyMode::Bot
                if self.notify.bot_token.is_none() || self.notify.channel_id.is_none() =>
            {
                anyhow::bail!(
                    "bot mode needs notify.bot_token and notify.channel_id \
                     (or DISCORD_BOT_TOKEN / DIGEST_CHANNEL_ID)"
                )
            }
            _ => Ok(()),
        }
    }
}
