use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{JobId, JobStatus, PipelineError, PipelineStage, StaleJob};

/// Configuration for the stale job reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// A job still `processing` after this long is considered abandoned.
    pub stale_after: Duration,
    /// Pause between sweeps.
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(3600),
            interval: Duration::from_secs(300),
        }
    }
}

/// Report of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaperReport {
    /// Jobs whose result was saved but whose final status write was lost.
    pub completed: Vec<JobId>,
    /// Jobs abandoned mid-pipeline, e.g. by a crashed worker.
    pub failed: Vec<JobId>,
    /// Jobs another writer moved on before the sweep got to them.
    pub skipped: usize,
}

impl ReaperReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty() && self.skipped == 0
    }
}

/// Moves jobs stranded in `processing` to a terminal state.
///
/// Uses the same conditional status write as the pipeline, so it can only
/// ever move a job forward.
pub struct StaleJobReaper {
    job_repository: Arc<dyn JobRepository>,
    config: ReaperConfig,
}

impl StaleJobReaper {
    pub fn new(job_repository: Arc<dyn JobRepository>, config: ReaperConfig) -> Self {
        Self {
            job_repository,
            config,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            stale_after_secs = self.config.stale_after.as_secs(),
            interval_secs = self.config.interval.as_secs(),
            "Stale job reaper started"
        );
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.reap_once().await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => tracing::info!(
                    completed = report.completed.len(),
                    failed = report.failed.len(),
                    skipped = report.skipped,
                    "Reconciled stale jobs"
                ),
                Err(e) => tracing::error!(error = %e, "Stale job sweep failed"),
            }
        }
        tracing::info!("Stale job reaper stopped");
    }

    pub async fn reap_once(&self) -> Result<ReaperReport, RepositoryError> {
        let mut report = ReaperReport::default();

        let Some(cutoff) = TimeDelta::from_std(self.config.stale_after)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(report);
        };

        for job in self.job_repository.list_stale_processing(cutoff).await? {
            self.reconcile(&job, &mut report).await;
        }

        Ok(report)
    }

    async fn reconcile(&self, job: &StaleJob, report: &mut ReaperReport) {
        let (status, message) = if job.has_result {
            (JobStatus::Completed, None)
        } else {
            let error = PipelineError::new(
                PipelineStage::Reconcile,
                format!(
                    "job exceeded the processing deadline of {}s without finishing",
                    self.config.stale_after.as_secs()
                ),
            );
            (JobStatus::Failed, Some(error.to_string()))
        };

        match self
            .job_repository
            .update_status(job.id, status, message.as_deref())
            .await
        {
            Ok(()) => {
                tracing::warn!(
                    job_id = %job.id,
                    status = %status,
                    last_update = %job.updated_at,
                    "Reconciled stale job"
                );
                match status {
                    JobStatus::Completed => report.completed.push(job.id),
                    _ => report.failed.push(job.id),
                }
            }
            Err(RepositoryError::InvalidTransition { .. }) => report.skipped += 1,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to reconcile stale job");
                report.skipped += 1;
            }
        }
    }
}
