use std::sync::Arc;

use crate::application::ports::{ContentPart, LlmClient};
use crate::domain::{GeneratedExam, ProblemStructure};

use super::prompts::PROBLEM_GENERATION_PROMPT;
use super::stage_error::decode_stage_json;
use super::{StageError, StageOutput, sanitize_json_response};

/// Generation stage: exam blueprint in, questions with answers out.
pub struct ProblemGenerator {
    llm_client: Arc<dyn LlmClient>,
}

impl ProblemGenerator {
    pub fn new(llm_client: Arc<dyn LlmClient>) -> Self {
        Self { llm_client }
    }

    pub async fn generate(
        &self,
        structure: &ProblemStructure,
    ) -> Result<StageOutput<GeneratedExam>, StageError> {
        let structure_json =
            serde_json::to_string_pretty(structure).map_err(StageError::Encode)?;
        let prompt = format!("{PROBLEM_GENERATION_PROMPT}{structure_json}\n");

        tracing::debug!(
            model = self.llm_client.model_name(),
            prompt_len = prompt.len(),
            "Requesting problem generation"
        );
        let response = self
            .llm_client
            .generate_content(&[ContentPart::Text(prompt)])
            .await?;

        let raw = response
            .first_candidate_text()
            .ok_or(StageError::NoContent("problem generation"))?;
        let sanitized = sanitize_json_response(&raw)?;
        let generated: GeneratedExam = decode_stage_json(&sanitized.json, "problem/answer")?;
        generated.validate()?;

        tracing::debug!(
            questions = generated.questions.len(),
            repaired = sanitized.repaired,
            "Problems generated"
        );

        Ok(StageOutput {
            value: generated,
            usage: response.usage,
        })
    }
}
