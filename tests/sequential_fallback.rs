// tests/sequential_fallback.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use arxiv_digest::inference::backend::{BatchHandle, BatchSnapshot, InferenceBackend};
use arxiv_digest::inference::decode::{decode_interest, decode_slots};
use arxiv_digest::inference::request::{GenerationHints, StructuredRequest};
use arxiv_digest::inference::sequential::SequentialFallbackClient;
use arxiv_digest::SchemaKind;

/// Succeeds for every call except the configured index.
struct FlakyBackend {
    fail_at: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceBackend for FlakyBackend {
    async fn create_batch(
        &self,
        _model: &str,
        _display_name: &str,
        _requests: &[StructuredRequest],
    ) -> Result<BatchHandle> {
        Err(anyhow!("not used in sequential tests"))
    }

    async fn poll_batch(&self, _job_id: &str) -> Result<BatchSnapshot> {
        Err(anyhow!("not used in sequential tests"))
    }

    async fn generate(&self, _model: &str, _request: &StructuredRequest) -> Result<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if index == self.fail_at {
            Err(anyhow!("simulated provider error"))
        } else {
            Ok(r#"{"interested_in":true}"#.to_string())
        }
    }
}

fn req(prompt: &str) -> StructuredRequest {
    StructuredRequest {
        prompt: prompt.into(),
        schema: SchemaKind::InterestCheck,
        hints: GenerationHints::default(),
    }
}

#[tokio::test]
async fn one_failed_item_does_not_abort_the_rest() {
    let backend = Arc::new(FlakyBackend {
        fail_at: 1,
        calls: AtomicUsize::new(0),
    });
    let client = SequentialFallbackClient::new(backend.clone(), Duration::ZERO);

    let requests = vec![req("p1"), req("p2"), req("p3")];
    let slots = client.run("model", &requests).await;

    assert_eq!(slots.len(), 3);
    assert!(slots[0].is_some());
    assert!(slots[1].is_none());
    assert!(slots[2].is_some());
    // every item was attempted
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

    // items 1 and 3 still decode; item 2 stays absent
    let decoded = decode_slots("interest-check", &slots, decode_interest);
    assert_eq!(decoded[0].map(|c| c.interested_in), Some(true));
    assert!(decoded[1].is_none());
    assert_eq!(decoded[2].map(|c| c.interested_in), Some(true));
}

#[tokio::test]
async fn empty_input_yields_empty_output() {
    let backend = Arc::new(FlakyBackend {
        fail_at: usize::MAX,
        calls: AtomicUsize::new(0),
    });
    let client = SequentialFallbackClient::new(backend.clone(), Duration::ZERO);
    let slots = client.run("model", &[]).await;
    assert!(slots.is_empty());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
