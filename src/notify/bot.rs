use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::discord::MessagePayload;
use super::{Notifier, PaperNotification};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Channel-message sender for the long-lived bot variant. Same payloads as
/// the webhook, delivered through an authenticated session.
pub struct DiscordBotNotifier {
    token: String,
    channel_id: String,
    client: Client,
    timeout: Duration,
}

impl DiscordBotNotifier {
    pub fn new(token: String, channel_id: String) -> Self {
        Self {
            token,
            channel_id,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn post(&self, payload: &MessagePayload) -> Result<()> {
        let url = format!(
            "{DISCORD_API_BASE}/channels/{}/messages",
            self.channel_id
        );
        self.client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .context("discord channel post")?
            .error_for_status()
            .context("discord channel non-2xx")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordBotNotifier {
    async fn send_notice(&self, text: &str) -> Result<()> {
        self.post(&MessagePayload::notice(text)).await
    }

    async fn send_paper(&self, record: &PaperNotification) -> Result<()> {
        self.post(&MessagePayload::paper(record)).await
    }

    fn name(&self) -> &'static str {
        "discord-bot"
    }
}
