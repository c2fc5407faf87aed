// src/inference/schema.rs
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which structured-output shape a request asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    InterestCheck,
    Summary,
}

impl SchemaKind {
    /// Response schema in the provider's OpenAPI-subset dialect.
    pub fn response_schema(&self) -> Value {
        match self {
            SchemaKind::InterestCheck => json!({
                "type": "OBJECT",
                "properties": {
                    "interested_in": { "type": "BOOLEAN" }
                },
                "required": ["interested_in"]
            }),
            SchemaKind::Summary => json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "summary": { "type": "STRING" },
                    "keywords": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "appendix": { "type": "STRING" }
                },
                "required": ["title", "summary", "keywords"]
            }),
        }
    }
}

/// Verdict of the interest filter for one paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestCheck {
    pub interested_in: bool,
}

/// Structured summary of one paper. `appendix` absent means "no
/// supplementary note" and stays absent all the way to delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appendix: Option<String>,
}
