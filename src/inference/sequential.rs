// src/inference/sequential.rs
//! One-at-a-time fallback: a synchronous call per request with a fixed delay
//! between items to stay under the provider's rate limit. A failed item is
//! recorded as absent and the rest of the sequence still runs — the property
//! batch mode lacks, where a whole-job failure takes every item down at once.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{info, warn};

use crate::inference::backend::InferenceBackend;
use crate::inference::request::StructuredRequest;

#[derive(Clone)]
pub struct SequentialFallbackClient {
    backend: Arc<dyn InferenceBackend>,
    delay: Duration,
}

impl SequentialFallbackClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, delay: Duration) -> Self {
        super::ensure_metrics_described();
        Self { backend, delay }
    }

    /// Same output shape as the batch client's `fetch_results`: one slot per
    /// request, index-aligned, absent where the call failed.
    pub async fn run(&self, model: &str, requests: &[StructuredRequest]) -> Vec<Option<String>> {
        let mut out = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            match self.backend.generate(model, request).await {
                Ok(payload) => {
                    info!(index = i, model, "sequential call succeeded");
                    out.push(Some(payload));
                }
                Err(e) => {
                    warn!(index = i, model, error = ?e, "sequential call failed");
                    counter!("inference_item_failures_total").increment(1);
                    out.push(None);
                }
            }
            if i + 1 < requests.len() {
                tokio::time::sleep(self.delay).await;
            }
        }
        out
    }
}
