//! Demo that pushes one sample record through the webhook notifier, for
//! checking the embed layout against a test channel.

use chrono::Utc;

use arxiv_digest::notify::discord::DiscordWebhookNotifier;
use arxiv_digest::notify::dispatch;
use arxiv_digest::PaperNotification;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let url = std::env::var("DIGEST_WEBHOOK_URL")
        .map_err(|_| anyhow::anyhow!("DIGEST_WEBHOOK_URL missing"))?;
    let notifier = DiscordWebhookNotifier::new(url);

    let record = PaperNotification {
        title: "Sample: Tropical compactifications of moduli spaces".into(),
        url: "https://arxiv.org/abs/2501.00001v1".into(),
        authors: "A. Author, B. Coauthor".into(),
        summary: "A short sample summary body, long enough to see the field wrap.".into(),
        appendix: Some("Sample appendix note.".into()),
        keywords: "tropical geometry, moduli spaces".into(),
        timestamp: Utc::now(),
    };

    let report = dispatch(
        &notifier,
        1,
        std::slice::from_ref(&record),
        std::time::Duration::from_millis(1_500),
    )
    .await;

    println!("notify-demo done: sent={} failed={}", report.sent, report.failed);
    Ok(())
}
