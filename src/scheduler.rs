// src/scheduler.rs
use metrics::counter;

use crate::app::App;

/// Daemon loop for the long-lived variant: one digest run per tick. Runs
/// forever; a failed tick is logged and the next tick still fires.
pub async fn run_daemon(app: &App, interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        counter!("digest_runs_total").increment(1);

        match app.run_once().await {
            Ok(status) => {
                tracing::info!(target: "digest", ?status, "digest tick finished");
            }
            Err(e) => {
                tracing::error!(target: "digest", error = ?e, "digest tick failed");
            }
        }
    }
}
