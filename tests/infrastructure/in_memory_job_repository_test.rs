use chrono::{TimeDelta, Utc};
use examsmith::application::ports::{JobRepository, RepositoryError};
use examsmith::domain::{JobInput, JobResult, JobStatus, ProblemStructure, TokenUsage};
use examsmith::infrastructure::persistence::InMemoryJobRepository;

use crate::helpers::{ARITHMETIC_EXAM, ARITHMETIC_STRUCTURE};

fn result() -> JobResult {
    JobResult {
        structure: serde_json::from_str::<ProblemStructure>(ARITHMETIC_STRUCTURE).unwrap(),
        generated: serde_json::from_str(ARITHMETIC_EXAM).unwrap(),
        token_usage: TokenUsage::default(),
    }
}

#[tokio::test]
async fn given_queued_job_when_claiming_twice_then_second_claim_is_rejected() {
    let repository = InMemoryJobRepository::new();
    let id = repository.insert_text("2+2=?");

    repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();
    let second = repository
        .update_status(id, JobStatus::Processing, None)
        .await;

    assert!(matches!(
        second,
        Err(RepositoryError::InvalidTransition {
            from: JobStatus::Processing,
            to: JobStatus::Processing
        })
    ));
}

#[tokio::test]
async fn given_terminal_job_when_updating_status_then_state_is_unchanged() {
    let repository = InMemoryJobRepository::new();
    let id = repository.insert_text("2+2=?");
    repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();
    repository
        .update_status(id, JobStatus::Failed, Some("boom"))
        .await
        .unwrap();

    let result = repository
        .update_status(id, JobStatus::Completed, None)
        .await;

    assert!(result.is_err());
    let job = repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("boom"));
}

#[tokio::test]
async fn given_queued_job_when_saving_result_then_rejects_write() {
    let repository = InMemoryJobRepository::new();
    let id = repository.insert_text("2+2=?");

    let saved = repository.save_result(id, &result()).await;

    assert!(matches!(
        saved,
        Err(RepositoryError::NotProcessing {
            current: JobStatus::Queued,
            ..
        })
    ));
}

#[tokio::test]
async fn given_binary_job_when_reading_input_then_returns_bytes() {
    let repository = InMemoryJobRepository::new();
    let id = repository.insert_binary(vec![1, 2, 3]);

    assert_eq!(
        repository.get_input(id).await.unwrap(),
        JobInput::Binary(vec![1, 2, 3])
    );
}

#[tokio::test]
async fn given_processing_jobs_when_listing_stale_then_applies_cutoff_and_result_flag() {
    let repository = InMemoryJobRepository::new();
    let fresh = repository.insert_text("fresh");
    let stale = repository.insert_text("stale");
    let stale_with_result = repository.insert_text("saved");
    for id in [fresh, stale, stale_with_result] {
        repository
            .update_status(id, JobStatus::Processing, None)
            .await
            .unwrap();
    }
    repository
        .save_result(stale_with_result, &result())
        .await
        .unwrap();
    repository.backdate(stale, TimeDelta::hours(2));
    repository.backdate(stale_with_result, TimeDelta::hours(2));

    let listed = repository
        .list_stale_processing(Utc::now() - TimeDelta::hours(1))
        .await
        .unwrap();

    let summary: Vec<_> = listed.iter().map(|j| (j.id, j.has_result)).collect();
    assert_eq!(summary, vec![(stale, false), (stale_with_result, true)]);
}

#[tokio::test]
async fn given_injected_fault_when_writing_then_fails_once_and_recovers() {
    let repository = InMemoryJobRepository::new();
    let id = repository.insert_text("2+2=?");
    repository.fail_status_writes(JobStatus::Processing, 1);

    let first = repository
        .update_status(id, JobStatus::Processing, None)
        .await;
    let second = repository
        .update_status(id, JobStatus::Processing, None)
        .await;

    assert!(matches!(first, Err(RepositoryError::QueryFailed(_))));
    assert!(second.is_ok());
    assert_eq!(
        repository.status_history(id),
        vec![JobStatus::Queued, JobStatus::Processing]
    );
}

#[tokio::test]
async fn given_saved_result_when_marking_failed_then_result_is_cleared() {
    let repository = InMemoryJobRepository::new();
    let id = repository.insert_text("2+2=?");
    repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();
    repository.save_result(id, &result()).await.unwrap();

    repository
        .update_status(id, JobStatus::Failed, Some("failed at stage 'reconcile': stale"))
        .await
        .unwrap();

    let job = repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.structure.is_none());
    assert!(job.generated_output.is_none());
    assert!(job.token_usage.is_none());
}
