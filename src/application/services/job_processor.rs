use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{JobId, JobResult, JobStatus, PipelineError, PipelineStage, TokenUsage};

use super::{ProblemGenerator, StructureExtractor};

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Upper bound for one model-backed stage.
    pub stage_timeout: Duration,
    /// Upper bound for one Job Store call.
    pub store_timeout: Duration,
    /// Attempts at the final `processing -> completed` write.
    pub completion_attempts: u32,
    pub completion_retry_delay: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(300),
            store_timeout: Duration::from_secs(30),
            completion_attempts: 3,
            completion_retry_delay: Duration::from_millis(500),
        }
    }
}

impl ProcessorConfig {
    /// Longest a claimed job can stay `processing` while a worker still owns it.
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.completion_attempts.max(1);
        // claim, input, result, result re-check, then each completion attempt
        let store_calls = 4 + attempts;
        self.stage_timeout.saturating_mul(2)
            + self.store_timeout.saturating_mul(store_calls)
            + self.completion_retry_delay.saturating_mul(attempts - 1)
    }
}

/// How a single delivery ended.
#[derive(Debug)]
pub enum JobOutcome {
    Completed { token_usage: TokenUsage },
    /// Recorded on the job as its error message.
    Failed(PipelineError),
    /// The job was not `queued` (a redelivery) or does not exist.
    Skipped { current: Option<JobStatus> },
    /// The claim write itself failed; nothing was recorded.
    Aborted { reason: String },
    /// Result persisted but the final status write failed; the reaper finishes it.
    CompletionUnconfirmed { reason: String },
    /// Cancelled before the job was claimed.
    Interrupted,
}

impl JobOutcome {
    /// Every outcome except an interruption is final and durably recorded.
    pub fn should_ack(&self) -> bool {
        !matches!(self, JobOutcome::Interrupted)
    }
}

/// Runs one job through claim, structuring, generation and persistence.
pub struct JobProcessor {
    job_repository: Arc<dyn JobRepository>,
    structure_extractor: StructureExtractor,
    problem_generator: ProblemGenerator,
    config: ProcessorConfig,
}

impl JobProcessor {
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        structure_extractor: StructureExtractor,
        problem_generator: ProblemGenerator,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            job_repository,
            structure_extractor,
            problem_generator,
            config,
        }
    }

    pub async fn process(&self, job_id: JobId, cancel: &CancellationToken) -> JobOutcome {
        if cancel.is_cancelled() {
            return JobOutcome::Interrupted;
        }

        tracing::debug!(status = %JobStatus::Processing, "Job status transition");
        let claim = guarded(
            cancel,
            self.config.store_timeout,
            self.job_repository
                .update_status(job_id, JobStatus::Processing, None),
        )
        .await;

        match claim {
            Ok(()) => {}
            Err(GuardError::Inner(RepositoryError::InvalidTransition { from, .. })) => {
                tracing::info!(current = %from, "Job is not queued, skipping redelivery");
                return JobOutcome::Skipped {
                    current: Some(from),
                };
            }
            Err(GuardError::Inner(RepositoryError::NotFound(_))) => {
                tracing::warn!("Job does not exist, skipping");
                return JobOutcome::Skipped { current: None };
            }
            Err(GuardError::Cancelled) => return JobOutcome::Interrupted,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim job");
                return JobOutcome::Aborted {
                    reason: e.to_string(),
                };
            }
        }

        match self.run_stages(job_id, cancel).await {
            Ok(token_usage) => self.complete(job_id, token_usage).await,
            Err(error) => {
                self.fail(job_id, &error).await;
                JobOutcome::Failed(error)
            }
        }
    }

    async fn run_stages(
        &self,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<TokenUsage, PipelineError> {
        let store_timeout = self.config.store_timeout;
        let stage_timeout = self.config.stage_timeout;

        let input = guarded(cancel, store_timeout, self.job_repository.get_input(job_id))
            .await
            .map_err(|e| PipelineError::new(PipelineStage::GetInputData, e))?;
        tracing::debug!(
            media_type = input.media_type(),
            input_len = input.len(),
            "Input loaded"
        );

        let structure = guarded(cancel, stage_timeout, self.structure_extractor.extract(input))
            .await
            .map_err(|e| PipelineError::new(PipelineStage::ExtractStructure, e))?;

        let generated = guarded(
            cancel,
            stage_timeout,
            self.problem_generator.generate(&structure.value),
        )
        .await
        .map_err(|e| PipelineError::new(PipelineStage::GenerateProblem, e))?;

        let token_usage = TokenUsage::from_stages(structure.usage, generated.usage);
        let result = JobResult {
            structure: structure.value,
            generated: generated.value,
            token_usage,
        };

        let saved = guarded(
            cancel,
            store_timeout,
            self.job_repository.save_result(job_id, &result),
        )
        .await;

        match saved {
            Ok(()) => {}
            // The write may have committed after its reply was abandoned.
            Err(e @ (GuardError::TimedOut(_) | GuardError::Cancelled)) => {
                if !self.result_landed(job_id).await {
                    return Err(PipelineError::new(PipelineStage::SaveResult, e));
                }
                tracing::warn!(error = %e, "Result write reply lost but the result is stored");
            }
            Err(e) => return Err(PipelineError::new(PipelineStage::SaveResult, e)),
        }

        Ok(token_usage)
    }

    async fn result_landed(&self, job_id: JobId) -> bool {
        let read = tokio::time::timeout(
            self.config.store_timeout,
            self.job_repository.get_by_id(job_id),
        )
        .await;

        match read {
            Ok(Ok(Some(job))) => {
                job.status == JobStatus::Processing && job.generated_output.is_some()
            }
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Could not check whether the result was stored");
                false
            }
            Err(_) => {
                tracing::warn!("Timed out checking whether the result was stored");
                false
            }
        }
    }

    /// The result is already durable here, so this step ignores cancellation.
    async fn complete(&self, job_id: JobId, token_usage: TokenUsage) -> JobOutcome {
        let attempts = self.config.completion_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            tracing::debug!(status = %JobStatus::Completed, attempt, "Job status transition");
            let write = tokio::time::timeout(
                self.config.store_timeout,
                self.job_repository
                    .update_status(job_id, JobStatus::Completed, None),
            )
            .await;

            match write {
                Ok(Ok(())) => {
                    tracing::info!(total_tokens = token_usage.total(), "Job completed");
                    return JobOutcome::Completed { token_usage };
                }
                // A previous attempt landed even though its response was lost.
                Ok(Err(RepositoryError::InvalidTransition {
                    from: JobStatus::Completed,
                    ..
                })) => {
                    tracing::info!(total_tokens = token_usage.total(), "Job completed");
                    return JobOutcome::Completed { token_usage };
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!(
                        "timed out after {}s",
                        self.config.store_timeout.as_secs_f64()
                    )
                }
            }

            tracing::warn!(attempt, attempts, error = %last_error, "Final status write failed");
            if attempt < attempts {
                tokio::time::sleep(self.config.completion_retry_delay).await;
            }
        }

        let error = PipelineError::new(PipelineStage::UpdateStatusCompleted, last_error);
        tracing::error!(
            error = %error,
            "Result saved but job left processing; reconciliation will complete it"
        );
        JobOutcome::CompletionUnconfirmed {
            reason: error.to_string(),
        }
    }

    async fn fail(&self, job_id: JobId, error: &PipelineError) {
        tracing::error!(stage = %error.stage, error = %error.cause, "Job failed");
        tracing::debug!(status = %JobStatus::Failed, "Job status transition");

        let message = error.to_string();
        let write = tokio::time::timeout(
            self.config.store_timeout,
            self.job_repository
                .update_status(job_id, JobStatus::Failed, Some(&message)),
        )
        .await;

        match write {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                error = %e,
                "Failed to record job failure; job stays processing until reconciled"
            ),
            Err(_) => tracing::error!(
                "Timed out recording job failure; job stays processing until reconciled"
            ),
        }
    }
}

enum GuardError<E> {
    Inner(E),
    TimedOut(Duration),
    Cancelled,
}

impl<E: fmt::Display> fmt::Display for GuardError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Inner(e) => write!(f, "{e}"),
            GuardError::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs_f64()),
            GuardError::Cancelled => write!(f, "cancelled: worker shutting down"),
        }
    }
}

/// Bounds `fut` by `limit` and abandons it as soon as `cancel` fires.
async fn guarded<T, E, F>(
    cancel: &CancellationToken,
    limit: Duration,
    fut: F,
) -> Result<T, GuardError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GuardError::Cancelled),
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(GuardError::Inner(e)),
            Err(_) => Err(GuardError::TimedOut(limit)),
        },
    }
}
