// src/inference/request.rs
use thiserror::Error;

use crate::inference::schema::SchemaKind;
use crate::search::types::Paper;

/// Optional knobs forwarded to the provider alongside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationHints {
    pub thinking_level: Option<String>,
}

impl GenerationHints {
    pub fn low_thinking() -> Self {
        Self {
            thinking_level: Some("low".to_string()),
        }
    }
}

/// One request unit: rendered prompt plus the schema the response must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredRequest {
    pub prompt: String,
    pub schema: SchemaKind,
    pub hints: GenerationHints,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("paper {id} has an empty {field}")]
    EmptyField { id: String, field: &'static str },
}

/// Render the prompt for one paper: title segment, abstract segment, then the
/// instruction template, each on its own delimited line. A paper with a blank
/// title or abstract is rejected rather than silently rendered empty.
pub fn build_request(
    paper: &Paper,
    template: &str,
    schema: SchemaKind,
    hints: GenerationHints,
) -> Result<StructuredRequest, BuildError> {
    let title = paper.title.trim();
    if title.is_empty() {
        return Err(BuildError::EmptyField {
            id: paper.id.clone(),
            field: "title",
        });
    }
    let abstract_text = paper.abstract_text.trim();
    if abstract_text.is_empty() {
        return Err(BuildError::EmptyField {
            id: paper.id.clone(),
            field: "abstract",
        });
    }

    let prompt = format!("\nTitle: {title}\n\nAbstract: {abstract_text}\n{template}");
    Ok(StructuredRequest {
        prompt,
        schema,
        hints,
    })
}
