/// Token counters reported by a single model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
}

/// Token accounting for a whole job, persisted together with its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub structure_prompt_tokens: u32,
    pub structure_candidates_tokens: u32,
    pub generation_prompt_tokens: u32,
    pub generation_candidates_tokens: u32,
}

impl TokenUsage {
    pub fn from_stages(structuring: UsageMetadata, generation: UsageMetadata) -> Self {
        Self {
            structure_prompt_tokens: structuring.prompt_token_count,
            structure_candidates_tokens: structuring.candidates_token_count,
            generation_prompt_tokens: generation.prompt_token_count,
            generation_candidates_tokens: generation.candidates_token_count,
        }
    }

    pub fn total(&self) -> u64 {
        u64::from(self.structure_prompt_tokens)
            + u64::from(self.structure_candidates_tokens)
            + u64::from(self.generation_prompt_tokens)
            + u64::from(self.generation_candidates_tokens)
    }
}
