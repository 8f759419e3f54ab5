use std::sync::Arc;

use crate::application::ports::{ContentPart, LlmClient};
use crate::domain::{JobInput, ProblemStructure};

use super::prompts::STRUCTURE_EXTRACTION_PROMPT;
use super::stage_error::decode_stage_json;
use super::{StageError, StageOutput, sanitize_json_response};

/// Structuring stage: raw submission in, exam blueprint out.
pub struct StructureExtractor {
    llm_client: Arc<dyn LlmClient>,
}

impl StructureExtractor {
    pub fn new(llm_client: Arc<dyn LlmClient>) -> Self {
        Self { llm_client }
    }

    pub async fn extract(
        &self,
        input: JobInput,
    ) -> Result<StageOutput<ProblemStructure>, StageError> {
        let mime_type = input.media_type();
        let input_part = match input {
            JobInput::Text(text) => ContentPart::Text(text),
            JobInput::Binary(data) => ContentPart::Blob {
                mime_type: mime_type.to_string(),
                data,
            },
        };
        let parts = [ContentPart::text(STRUCTURE_EXTRACTION_PROMPT), input_part];

        tracing::debug!(
            model = self.llm_client.model_name(),
            "Requesting structure extraction"
        );
        let response = self.llm_client.generate_content(&parts).await?;

        let raw = response
            .first_candidate_text()
            .ok_or(StageError::NoContent("structure extraction"))?;
        let sanitized = sanitize_json_response(&raw)?;
        let structure: ProblemStructure = decode_stage_json(&sanitized.json, "structure")?;

        tracing::debug!(
            sections = structure.structure.major_sections.len(),
            sub_questions = structure.sub_question_count(),
            repaired = sanitized.repaired,
            "Structure extracted"
        );

        Ok(StageOutput {
            value: structure,
            usage: response.usage,
        })
    }
}
