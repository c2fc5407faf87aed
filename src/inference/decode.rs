// src/inference/decode.rs
//! Parse raw payloads back into typed records. A payload that fails to
//! decode collapses to an absent slot — the same outcome as the provider
//! returning nothing for that item — and never crosses the stage boundary
//! as a panic or a placeholder record.

use metrics::counter;
use thiserror::Error;
use tracing::warn;

use crate::inference::schema::{InterestCheck, Summary};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}

pub fn decode_interest(raw: &str) -> Result<InterestCheck, DecodeError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn decode_summary(raw: &str) -> Result<Summary, DecodeError> {
    let summary: Summary = serde_json::from_str(raw)?;
    if summary.title.trim().is_empty() {
        return Err(DecodeError::EmptyField("title"));
    }
    if summary.summary.trim().is_empty() {
        return Err(DecodeError::EmptyField("summary"));
    }
    Ok(summary)
}

/// Decode every slot, logging failures with their index. Output stays
/// index-aligned with the input.
pub fn decode_slots<T, F>(stage: &str, slots: &[Option<String>], decode: F) -> Vec<Option<T>>
where
    F: Fn(&str) -> Result<T, DecodeError>,
{
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            None => {
                warn!(stage, index, "no payload for slot");
                None
            }
            Some(raw) => match decode(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(stage, index, error = %e, "payload failed to decode");
                    counter!("inference_decode_failures_total").increment(1);
                    None
                }
            },
        })
        .collect()
}
