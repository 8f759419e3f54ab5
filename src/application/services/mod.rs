mod job_processor;
mod problem_generator;
mod prompts;
mod queue_consumer;
mod response_sanitizer;
mod stage_error;
mod stale_job_reaper;
mod structure_extractor;

pub use job_processor::{JobOutcome, JobProcessor, ProcessorConfig};
pub use problem_generator::ProblemGenerator;
pub use prompts::{PROBLEM_GENERATION_PROMPT, STRUCTURE_EXTRACTION_PROMPT};
pub use queue_consumer::{ConsumerStats, QueueConsumer};
pub use response_sanitizer::{SanitizeError, SanitizedJson, sanitize_json_response};
pub use stage_error::{StageError, StageOutput};
pub use stale_job_reaper::{ReaperConfig, ReaperReport, StaleJobReaper};
pub use structure_extractor::StructureExtractor;
