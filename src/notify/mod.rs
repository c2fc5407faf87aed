// src/notify/mod.rs
pub mod bot;
pub mod discord;

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{NotifyConfig, NotifyMode};
use crate::inference::schema::Summary;
use crate::search::types::Paper;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("notify_sent_total", "Messages delivered to the channel.");
        describe_counter!("notify_failures_total", "Messages that failed to deliver.");
    });
}

/// One delivered paper, already rendered to display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperNotification {
    pub title: String,
    pub url: String,
    pub authors: String,
    pub summary: String,
    pub appendix: Option<String>,
    pub keywords: String,
    pub timestamp: DateTime<Utc>,
}

impl PaperNotification {
    pub fn from_pair(paper: &Paper, summary: &Summary, timestamp: DateTime<Utc>) -> Self {
        Self {
            title: summary.title.clone(),
            url: paper.id.clone(),
            authors: paper.authors.join(", "),
            summary: summary.summary.clone(),
            appendix: summary.appendix.clone(),
            keywords: summary.keywords.join(", "),
            timestamp,
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Plain text notice, sent once per run before the rich records.
    async fn send_notice(&self, text: &str) -> Result<()>;
    /// One rich record.
    async fn send_paper(&self, record: &PaperNotification) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Select the delivery channel at startup from configuration.
pub fn build_notifier(cfg: &NotifyConfig) -> anyhow::Result<Box<dyn Notifier>> {
    match cfg.mode {
        NotifyMode::Webhook => {
            let url = cfg
                .webhook_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("webhook mode without a webhook url"))?;
            Ok(Box::new(discord::DiscordWebhookNotifier::new(url)))
        }
        NotifyMode::Bot => {
            let token = cfg
                .bot_token
                .clone()
                .ok_or_else(|| anyhow::anyhow!("bot mode without a bot token"))?;
            let channel_id = cfg
                .channel_id
                .clone()
                .ok_or_else(|| anyhow::anyhow!("bot mode without a channel id"))?;
            Ok(Box::new(bot::DiscordBotNotifier::new(token, channel_id)))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// Send the notice, then every record in order, pacing between sends to
/// respect the channel's rate limit. A failed send is logged and counted;
/// the remaining records still go out.
pub async fn dispatch(
    notifier: &dyn Notifier,
    interesting: usize,
    records: &[PaperNotification],
    pacing: Duration,
) -> DeliveryReport {
    ensure_metrics_described();

    let mut report = DeliveryReport::default();
    let notice = format!("{interesting} interesting papers found");
    match notifier.send_notice(&notice).await {
        Ok(()) => {
            counter!("notify_sent_total").increment(1);
            report.sent += 1;
        }
        Err(e) => {
            warn!(channel = notifier.name(), error = ?e, "notice delivery failed");
            counter!("notify_failures_total").increment(1);
            report.failed += 1;
        }
    }

    for (index, record) in records.iter().enumerate() {
        match notifier.send_paper(record).await {
            Ok(()) => {
                counter!("notify_sent_total").increment(1);
                report.sent += 1;
            }
            Err(e) => {
                warn!(
                    channel = notifier.name(),
                    index,
                    url = %record.url,
                    error = ?e,
                    "record delivery failed"
                );
                counter!("notify_failures_total").increment(1);
                report.failed += 1;
            }
        }
        if index + 1 < records.len() {
            tokio::time::sleep(pacing).await;
        }
    }

    info!(
        channel = notifier.name(),
        sent = report.sent,
        failed = report.failed,
        "dispatch finished"
    );
    report
}
