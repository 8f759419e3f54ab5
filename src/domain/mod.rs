mod generated_exam;
mod job;
mod job_id;
mod job_input;
mod job_status;
mod pipeline_stage;
mod problem_structure;
mod token_usage;

pub use generated_exam::{GeneratedExam, GeneratedExamError, GeneratedExamMeta, GeneratedQuestion};
pub use job::{Job, JobResult, StaleJob};
pub use job_id::JobId;
pub use job_input::{JobInput, JobInputError};
pub use job_status::JobStatus;
pub use pipeline_stage::{PipelineError, PipelineStage};
pub use problem_structure::{ExamMeta, MajorSection, ProblemStructure, StructureBody, SubQuestion};
pub use token_usage::{TokenUsage, UsageMetadata};
