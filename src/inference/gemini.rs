// src/inference/gemini.rs
//! Gemini REST backend: inlined batch jobs polled as long-running operations,
//! plus the synchronous per-request path.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::inference::backend::{BatchHandle, BatchSnapshot, InferenceBackend, JobState};
use crate::inference::request::StructuredRequest;

const API_BASE: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    base: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("arxiv-digest/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            base: API_BASE.to_string(),
        }
    }

    /// Point at a different API root (local stub in tests).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// `{contents, generationConfig}` for one request, shared by both paths.
    fn request_body(request: &StructuredRequest) -> Value {
        let mut generation_config = json!({
            "responseMimeType": "application/json",
            "responseSchema": request.schema.response_schema(),
        });
        if let Some(level) = &request.hints.thinking_level {
            generation_config["thinkingConfig"] = json!({ "thinkingLevel": level });
        }
        json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        })
    }
}

// ---- Wire shapes ----

#[derive(Deserialize)]
struct Operation {
    name: Option<String>,
    #[serde(default)]
    metadata: Option<OperationMetadata>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<BatchOutput>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct OperationMetadata {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutput {
    #[serde(default)]
    inlined_responses: Option<InlinedResponses>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlinedResponses {
    #[serde(default)]
    inlined_responses: Vec<InlinedResponse>,
}

#[derive(Deserialize)]
struct InlinedResponse {
    #[serde(default)]
    response: Option<GenerateContentResponse>,
    #[serde(default)]
    #[allow(dead_code)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl Operation {
    fn state(&self) -> JobState {
        if let Some(state) = self.metadata.as_ref().and_then(|m| m.state.as_deref()) {
            return JobState::from_provider(state);
        }
        if self.done {
            if self.error.is_some() {
                JobState::Failed
            } else {
                JobState::Succeeded
            }
        } else {
            JobState::Running
        }
    }

    fn slot_payloads(&self) -> Option<Vec<Option<String>>> {
        let inlined = self
            .response
            .as_ref()?
            .inlined_responses
            .as_ref()?;
        Some(
            inlined
                .inlined_responses
                .iter()
                .map(|item| item.response.as_ref().and_then(|r| r.text()))
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl InferenceBackend for GeminiBackend {
    async fn create_batch(
        &self,
        model: &str,
        display_name: &str,
        requests: &[StructuredRequest],
    ) -> Result<BatchHandle> {
        let url = format!("{}/v1beta/models/{model}:batchGenerateContent", self.base);
        let inlined: Vec<Value> = requests
            .iter()
            .map(|r| json!({ "request": Self::request_body(r) }))
            .collect();
        let body = json!({
            "batch": {
                "displayName": display_name,
                "inputConfig": { "requests": { "requests": inlined } },
            }
        });

        let op: Operation = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .context("batch create send")?
            .error_for_status()
            .context("batch create non-2xx")?
            .json()
            .await
            .context("batch create decode")?;

        let id = op
            .name
            .clone()
            .ok_or_else(|| anyhow!("batch create response carried no operation name"))?;
        Ok(BatchHandle {
            id,
            state: op.state(),
        })
    }

    async fn poll_batch(&self, job_id: &str) -> Result<BatchSnapshot> {
        let url = format!("{}/v1beta/{job_id}", self.base);
        let op: Operation = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("batch poll send")?
            .error_for_status()
            .context("batch poll non-2xx")?
            .json()
            .await
            .context("batch poll decode")?;

        let state = op.state();
        let results = if state == JobState::Succeeded {
            op.slot_payloads()
        } else {
            None
        };
        Ok(BatchSnapshot { state, results })
    }

    async fn generate(&self, model: &str, request: &StructuredRequest) -> Result<String> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base);
        let body = Self::request_body(request);

        let resp: GenerateContentResponse = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .context("generate send")?
            .error_for_status()
            .context("generate non-2xx")?
            .json()
            .await
            .context("generate decode")?;

        resp.text()
            .ok_or_else(|| anyhow!("generate response carried no candidate text"))
    }
}
