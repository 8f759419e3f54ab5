use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{ContentPart, GenerationResponse, LlmClient, LlmClientError};
use crate::domain::UsageMetadata;

type Scripted = Result<GenerationResponse, LlmClientError>;

/// Replays queued responses in order and records every request it receives.
pub struct ScriptedLlmClient {
    model: String,
    latency: Option<Duration>,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Vec<ContentPart>>>,
}

impl ScriptedLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            latency: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call sleeps this long on the tokio clock before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_text(&self, text: impl Into<String>, usage: UsageMetadata) -> &Self {
        self.push_response(GenerationResponse::from_text(text, usage))
    }

    pub fn push_response(&self, response: GenerationResponse) -> &Self {
        lock(&self.script).push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: LlmClientError) -> &Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Vec<ContentPart>> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate_content(
        &self,
        parts: &[ContentPart],
    ) -> Result<GenerationResponse, LlmClientError> {
        lock(&self.requests).push(parts.to_vec());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        lock(&self.script).pop_front().unwrap_or_else(|| {
            Err(LlmClientError::ApiRequestFailed(format!(
                "no scripted response left for {}",
                self.model
            )))
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
