use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Job, JobId, JobInput, JobResult, JobStatus, StaleJob};

use super::RepositoryError;

/// Persistence boundary of the pipeline.
///
/// Every write is a single conditional statement: a status is only entered
/// from one of its [`JobStatus::predecessors`], and results are only accepted
/// while the job is `processing`.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Reads the submitted input. An unknown id is `RepositoryError::NotFound`.
    async fn get_input(&self, id: JobId) -> Result<JobInput, RepositoryError>;

    /// Moves the job to `status`, clearing or setting `error_message`.
    ///
    /// Fails with `InvalidTransition` when the current status is not a
    /// predecessor of `status`.
    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Persists structure, generated output and token usage atomically.
    async fn save_result(&self, id: JobId, result: &JobResult) -> Result<(), RepositoryError>;

    /// Jobs in `processing` whose last update is at or before `cutoff`.
    async fn list_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StaleJob>, RepositoryError>;
}
