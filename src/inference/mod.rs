// src/inference/mod.rs
pub mod backend;
pub mod batch;
pub mod decode;
pub mod gemini;
pub mod request;
pub mod schema;
pub mod sequential;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("inference_batch_jobs_total", "Batch jobs submitted.");
        describe_counter!(
            "inference_poll_iterations_total",
            "Status round trips across all batch jobs."
        );
        describe_counter!(
            "inference_item_failures_total",
            "Per-item call failures on the sequential path."
        );
        describe_counter!(
            "inference_decode_failures_total",
            "Payloads that failed schema decoding."
        );
        describe_histogram!(
            "inference_batch_wait_secs",
            "Wall-clock seconds from submit to terminal state."
        );
    });
}
