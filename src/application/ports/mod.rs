mod job_repository;
mod llm_client;
mod repository_error;
mod work_queue;

pub use job_repository::JobRepository;
pub use llm_client::{Candidate, ContentPart, GenerationResponse, LlmClient, LlmClientError};
pub use repository_error::RepositoryError;
pub use work_queue::{JobMessage, QueueDelivery, QueueError, WorkQueue};
