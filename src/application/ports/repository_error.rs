use crate::domain::{JobId, JobInputError, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: JobStatus, to: JobStatus },
    #[error("job {id} is '{current}', results are only accepted while processing")]
    NotProcessing { id: JobId, current: JobStatus },
    #[error("invalid input for job {id}: {source}")]
    InvalidInput {
        id: JobId,
        #[source]
        source: JobInputError,
    },
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}
