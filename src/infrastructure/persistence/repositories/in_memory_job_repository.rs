use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{Job, JobId, JobInput, JobResult, JobStatus, StaleJob};

/// Process-local Job Store with the same conditional-write rules as Postgres.
///
/// Records every status a job passes through and can be told to fail
/// specific writes, which makes it the store of choice for pipeline tests.
#[derive(Default)]
pub struct InMemoryJobRepository {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    jobs: BTreeMap<JobId, StoredJob>,
    next_id: i64,
    failing_status_writes: HashMap<JobStatus, usize>,
    failing_saves: usize,
    stall_after_save: Option<Duration>,
}

struct StoredJob {
    text: Option<String>,
    binary: Option<Vec<u8>>,
    status: JobStatus,
    error_message: Option<String>,
    result: Option<JobResult>,
    history: Vec<JobStatus>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queued job the way ingress would.
    pub fn insert(&self, text: Option<String>, binary: Option<Vec<u8>>) -> JobId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = JobId::new(state.next_id);
        let now = Utc::now();
        state.jobs.insert(
            id,
            StoredJob {
                text,
                binary,
                status: JobStatus::Queued,
                error_message: None,
                result: None,
                history: vec![JobStatus::Queued],
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn insert_text(&self, text: &str) -> JobId {
        self.insert(Some(text.to_string()), None)
    }

    pub fn insert_binary(&self, data: Vec<u8>) -> JobId {
        self.insert(None, Some(data))
    }

    /// Every status the job has held, oldest first.
    pub fn status_history(&self, id: JobId) -> Vec<JobStatus> {
        self.lock()
            .jobs
            .get(&id)
            .map(|job| job.history.clone())
            .unwrap_or_default()
    }

    /// Makes the next `times` writes of `status` fail with a query error.
    pub fn fail_status_writes(&self, status: JobStatus, times: usize) {
        self.lock().failing_status_writes.insert(status, times);
    }

    /// Makes the next `times` result writes fail with a query error.
    pub fn fail_result_writes(&self, times: usize) {
        self.lock().failing_saves = times;
    }

    /// Makes result writes commit and then hold the reply for `delay`.
    pub fn stall_after_result_writes(&self, delay: Duration) {
        self.lock().stall_after_save = Some(delay);
    }

    /// Moves the job's last update into the past.
    pub fn backdate(&self, id: JobId, by: TimeDelta) {
        if let Some(job) = self.lock().jobs.get_mut(&id) {
            job.updated_at -= by;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn take_fault(remaining: &mut usize) -> bool {
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock().jobs.get(&id).map(|job| Job {
            id,
            status: job.status,
            error_message: job.error_message.clone(),
            structure: job.result.as_ref().map(|r| r.structure.clone()),
            generated_output: job.result.as_ref().map(|r| r.generated.clone()),
            token_usage: job.result.as_ref().map(|r| r.token_usage),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }))
    }

    async fn get_input(&self, id: JobId) -> Result<JobInput, RepositoryError> {
        let state = self.lock();
        let job = state.jobs.get(&id).ok_or(RepositoryError::NotFound(id))?;
        JobInput::from_columns(job.text.clone(), job.binary.clone())
            .map_err(|source| RepositoryError::InvalidInput { id, source })
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();

        if let Some(remaining) = state.failing_status_writes.get_mut(&status) {
            if take_fault(remaining) {
                return Err(RepositoryError::QueryFailed(format!(
                    "injected failure writing '{status}'"
                )));
            }
        }

        let job = state.jobs.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        if !job.status.can_transition_to(status) {
            return Err(RepositoryError::InvalidTransition {
                from: job.status,
                to: status,
            });
        }

        job.status = status;
        job.error_message = error_message.map(str::to_string);
        if status == JobStatus::Failed {
            job.result = None;
        }
        job.history.push(status);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn save_result(&self, id: JobId, result: &JobResult) -> Result<(), RepositoryError> {
        let stall = {
            let mut state = self.lock();

            if take_fault(&mut state.failing_saves) {
                return Err(RepositoryError::QueryFailed(
                    "injected failure saving result".to_string(),
                ));
            }

            let stall = state.stall_after_save;
            let job = state.jobs.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
            if job.status != JobStatus::Processing {
                return Err(RepositoryError::NotProcessing {
                    id,
                    current: job.status,
                });
            }

            job.result = Some(result.clone());
            job.updated_at = Utc::now();
            stall
        };

        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn list_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StaleJob>, RepositoryError> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .filter(|(_, job)| job.status == JobStatus::Processing && job.updated_at <= cutoff)
            .map(|(id, job)| StaleJob {
                id: *id,
                has_result: job.result.is_some(),
                updated_at: job.updated_at,
            })
            .collect())
    }
}
