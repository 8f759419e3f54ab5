use crate::application::ports::LlmClientError;
use crate::domain::{GeneratedExamError, UsageMetadata};

use super::SanitizeError;

/// Result of one model-backed stage together with what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput<T> {
    pub value: T,
    pub usage: UsageMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("model request failed: {0}")]
    Llm(#[from] LlmClientError),
    #[error("no content from model for {0}")]
    NoContent(&'static str),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    #[error("failed to decode {what}: {source}. Final JSON string: {json}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
        json: String,
    },
    #[error("failed to encode problem structure: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid generated output: {0}")]
    Invalid(#[from] GeneratedExamError),
}

pub(super) fn decode_stage_json<T>(json: &str, what: &'static str) -> Result<T, StageError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(json).map_err(|source| StageError::Decode {
        what,
        source,
        json: json.to_string(),
    })
}
