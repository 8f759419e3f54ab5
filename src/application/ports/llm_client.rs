use async_trait::async_trait;

use crate::domain::UsageMetadata;

/// One piece of a model request or candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Blob { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Blob { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub candidates: Vec<Candidate>,
    pub usage: UsageMetadata,
}

impl GenerationResponse {
    pub fn from_text(text: impl Into<String>, usage: UsageMetadata) -> Self {
        Self {
            candidates: vec![Candidate {
                parts: vec![ContentPart::Text(text.into())],
            }],
            usage,
        }
    }

    /// Concatenated text parts of the first candidate.
    ///
    /// `None` when there is no candidate or the first candidate has no parts.
    pub fn first_candidate_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        if candidate.parts.is_empty() {
            return None;
        }
        Some(candidate.parts.iter().filter_map(ContentPart::as_text).collect())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_content(
        &self,
        parts: &[ContentPart],
    ) -> Result<GenerationResponse, LlmClientError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("rate limited")]
    RateLimited,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("request timed out")]
    Timeout,
}
