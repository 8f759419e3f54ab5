use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::application::ports::{
    Candidate, ContentPart, GenerationResponse, LlmClient, LlmClientError,
};
use crate::domain::UsageMetadata;
use crate::infrastructure::observability::log_preview;

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

/// Gemini `generateContent` over REST, bound to a single model.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, LlmClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmClientError::ApiRequestFailed(format!("http client: {e}")))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
        })
    }

    fn request_body(parts: &[ContentPart]) -> GenerateContentRequest<'_> {
        let parts = parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => RequestPart::Text { text },
                ContentPart::Blob { mime_type, data } => RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: general_purpose::STANDARD.encode(data),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    #[tracing::instrument(skip(self, parts), fields(model = %self.model, parts = parts.len()))]
    async fn generate_content(
        &self,
        parts: &[ContentPart],
    ) -> Result<GenerationResponse, LlmClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&Self::request_body(parts))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmClientError::Timeout
                } else {
                    LlmClientError::ApiRequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmClientError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmClientError::ApiRequestFailed(format!(
                "Gemini returned {status}: {}",
                log_preview(&text)
            )));
        }

        let raw_bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                LlmClientError::Timeout
            } else {
                LlmClientError::ApiRequestFailed(format!("reading response body: {e}"))
            }
        })?;

        let body: GenerateContentResponse = serde_json::from_slice(&raw_bytes).map_err(|e| {
            tracing::error!(
                raw_response = %log_preview(&String::from_utf8_lossy(&raw_bytes)),
                "Failed to parse Gemini response"
            );
            LlmClientError::InvalidResponse(e.to_string())
        })?;

        let response = body.into_generation_response()?;
        tracing::debug!(
            candidates = response.candidates.len(),
            prompt_tokens = response.usage.prompt_token_count,
            candidate_tokens = response.usage.candidates_token_count,
            preview = %log_preview(&response.first_candidate_text().unwrap_or_default()),
            "Gemini responded"
        );

        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    usage_metadata: Option<ResponseUsage>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResponseUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GenerateContentResponse {
    fn into_generation_response(self) -> Result<GenerationResponse, LlmClientError> {
        let candidates = self
            .candidates
            .into_iter()
            .map(|candidate| {
                let parts = candidate
                    .content
                    .map(|content| content.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(ResponsePart::into_content_part)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Candidate { parts })
            })
            .collect::<Result<Vec<_>, LlmClientError>>()?;

        let usage = self.usage_metadata.unwrap_or_default();
        Ok(GenerationResponse {
            candidates,
            usage: UsageMetadata {
                prompt_token_count: usage.prompt_token_count,
                candidates_token_count: usage.candidates_token_count,
            },
        })
    }
}

impl ResponsePart {
    fn into_content_part(self) -> Option<Result<ContentPart, LlmClientError>> {
        if let Some(text) = self.text {
            return Some(Ok(ContentPart::Text(text)));
        }
        let blob = self.inline_data?;
        Some(
            general_purpose::STANDARD
                .decode(blob.data)
                .map(|data| ContentPart::Blob {
                    mime_type: blob.mime_type,
                    data,
                })
                .map_err(|e| LlmClientError::InvalidResponse(format!("inline data: {e}"))),
        )
    }
}
