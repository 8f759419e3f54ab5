use chrono::{DateTime, Utc};

use super::{GeneratedExam, JobId, JobStatus, ProblemStructure, TokenUsage};

/// Read model of a problem-generation job as seen by status pollers.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub structure: Option<ProblemStructure>,
    pub generated_output: Option<GeneratedExam>,
    pub token_usage: Option<TokenUsage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a successful run persists, written as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub structure: ProblemStructure,
    pub generated: GeneratedExam,
    pub token_usage: TokenUsage,
}

/// A job left in `processing` longer than the reconciliation threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleJob {
    pub id: JobId,
    pub has_result: bool,
    pub updated_at: DateTime<Utc>,
}
