//! arXiv digest — binary entrypoint.
//! Wires configuration, the inference backend, and the selected delivery
//! channel, then runs the pipeline once (default) or on a daemon interval.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arxiv_digest::config::AppConfig;
use arxiv_digest::inference::backend::InferenceBackend;
use arxiv_digest::inference::gemini::GeminiBackend;
use arxiv_digest::search::arxiv::ArxivProvider;
use arxiv_digest::{notify, scheduler, App, Pipeline, PromptSet};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arxiv_digest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config_path = std::env::var("DIGEST_CONFIG_PATH")
        .unwrap_or_else(|_| "config/digest.toml".to_string());
    let cfg = match AppConfig::load_from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(path = %config_path, error = ?e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let backend: Arc<dyn InferenceBackend> =
        Arc::new(GeminiBackend::new(cfg.inference.api_key.clone()));
    let pipeline = Pipeline::new(backend, cfg.inference.clone(), PromptSet::builtin());
    let notifier = match notify::build_notifier(&cfg.notify) {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::error!(error = ?e, "failed to build notifier");
            return ExitCode::FAILURE;
        }
    };

    let app = App::new(
        Box::new(ArxivProvider::new()),
        cfg.search.clone(),
        pipeline,
        notifier,
        Duration::from_millis(cfg.notify.pacing_ms),
    );

    if cfg.run.daemon {
        scheduler::run_daemon(&app, cfg.run.interval_secs).await;
        return ExitCode::SUCCESS; // run_daemon loops forever
    }

    match app.run_once().await {
        Ok(status) if status.is_success() => {
            tracing::info!(?status, "digest run finished");
            ExitCode::SUCCESS
        }
        Ok(status) => {
            tracing::warn!(?status, "digest run finished with delivery failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = ?e, "digest run failed");
            ExitCode::FAILURE
        }
    }
}
