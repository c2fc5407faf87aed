use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Notifier, PaperNotification};

// arXiv brand red, used for the embed accent bar.
const EMBED_COLOR: u32 = 0x00E1_2D2D;

#[derive(Clone)]
pub struct DiscordWebhookNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordWebhookNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    async fn post(&self, payload: &MessagePayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("Discord webhook HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("Discord webhook request failed: {e}"));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordWebhookNotifier {
    async fn send_notice(&self, text: &str) -> Result<()> {
        self.post(&MessagePayload::notice(text)).await
    }

    async fn send_paper(&self, record: &PaperNotification) -> Result<()> {
        self.post(&MessagePayload::paper(record)).await
    }

    fn name(&self) -> &'static str {
        "discord-webhook"
    }
}

#[derive(Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    url: String,
    color: u32,
    timestamp: String,
    fields: Vec<EmbedField>,
}

#[derive(Serialize)]
pub(super) struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

impl MessagePayload {
    pub(super) fn notice(text: &str) -> Self {
        Self {
            content: Some(text.to_string()),
            embeds: Vec::new(),
        }
    }

    /// Field order matches the reading order in the channel: authors,
    /// summary, optional appendix, keywords. No appendix means no field
    /// at all, not an empty one.
    pub(super) fn paper(record: &PaperNotification) -> Self {
        let mut fields = vec![
            EmbedField {
                name: "Authors".to_string(),
                value: record.authors.clone(),
                inline: false,
            },
            EmbedField {
                name: "Summary".to_string(),
                value: record.summary.clone(),
                inline: false,
            },
        ];
        if let Some(appendix) = &record.appendix {
            fields.push(EmbedField {
                name: "Appendix".to_string(),
                value: appendix.clone(),
                inline: false,
            });
        }
        fields.push(EmbedField {
            name: "Keywords".to_string(),
            value: record.keywords.clone(),
            inline: false,
        });

        Self {
            content: None,
            embeds: vec![Embed {
                title: record.title.clone(),
                url: record.url.clone(),
                color: EMBED_COLOR,
                timestamp: record.timestamp.to_rfc3339(),
                fields,
            }],
        }
    }
}
