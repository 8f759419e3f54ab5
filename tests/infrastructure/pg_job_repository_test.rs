use std::time::Duration;

use chrono::{TimeDelta, Utc};
use examsmith::application::ports::{JobRepository, RepositoryError};
use examsmith::domain::{JobInput, JobResult, JobStatus, ProblemStructure, TokenUsage};

use crate::helpers::{ARITHMETIC_EXAM, ARITHMETIC_STRUCTURE, TestPostgres};

fn result() -> JobResult {
    JobResult {
        structure: serde_json::from_str::<ProblemStructure>(ARITHMETIC_STRUCTURE).unwrap(),
        generated: serde_json::from_str(ARITHMETIC_EXAM).unwrap(),
        token_usage: TokenUsage {
            structure_prompt_tokens: 100,
            structure_candidates_tokens: 40,
            generation_prompt_tokens: 200,
            generation_candidates_tokens: 80,
        },
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_new_row_when_reading_then_job_is_queued_with_text_input() {
    let test_pg = TestPostgres::new().await;
    let id = test_pg.insert_job(Some("2+2=?"), None).await;

    let job = test_pg
        .job_repository
        .get_by_id(id)
        .await
        .expect("Failed to retrieve job")
        .expect("Job not found");
    let input = test_pg.job_repository.get_input(id).await.unwrap();

    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.generated_output.is_none());
    assert_eq!(input, JobInput::Text("2+2=?".to_string()));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_legacy_pending_row_when_claiming_then_moves_to_processing() {
    let test_pg = TestPostgres::new().await;
    let id = test_pg.insert_job(None, Some(b"%PDF-1.7")).await;
    test_pg.set_raw_status(id, "pending").await;

    test_pg
        .job_repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .expect("Failed to claim legacy row");

    let job = test_pg.job_repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_claimed_row_when_claiming_again_then_reports_invalid_transition() {
    let test_pg = TestPostgres::new().await;
    let id = test_pg.insert_job(Some("2+2=?"), None).await;
    test_pg
        .job_repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();

    let second = test_pg
        .job_repository
        .update_status(id, JobStatus::Processing, None)
        .await;

    assert!(matches!(
        second,
        Err(RepositoryError::InvalidTransition {
            from: JobStatus::Processing,
            ..
        })
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_processing_row_when_saving_result_and_completing_then_result_round_trips() {
    let test_pg = TestPostgres::new().await;
    let id = test_pg.insert_job(Some("2+2=?"), None).await;
    let repository = &test_pg.job_repository;
    repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();

    repository.save_result(id, &result()).await.unwrap();
    repository
        .update_status(id, JobStatus::Completed, None)
        .await
        .unwrap();

    let job = repository.get_by_id(id).await.unwrap().unwrap();
    let expected = result();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.structure, Some(expected.structure));
    assert_eq!(job.generated_output, Some(expected.generated));
    assert_eq!(job.token_usage, Some(expected.token_usage));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_row_with_saved_result_when_marking_failed_then_result_columns_are_cleared() {
    let test_pg = TestPostgres::new().await;
    let id = test_pg.insert_job(Some("2+2=?"), None).await;
    let repository = &test_pg.job_repository;
    repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();
    repository.save_result(id, &result()).await.unwrap();

    repository
        .update_status(id, JobStatus::Failed, Some("failed at stage 'reconcile': stale"))
        .await
        .expect("Failed to mark row failed");

    let job = repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.structure.is_none());
    assert!(job.generated_output.is_none());
    assert!(job.token_usage.is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_failed_row_when_saving_result_then_write_is_rejected() {
    let test_pg = TestPostgres::new().await;
    let id = test_pg.insert_job(Some("2+2=?"), None).await;
    let repository = &test_pg.job_repository;
    repository
        .update_status(id, JobStatus::Processing, None)
        .await
        .unwrap();
    repository
        .update_status(id, JobStatus::Failed, Some("failed at stage 'extract_structure': x"))
        .await
        .unwrap();

    let saved = repository.save_result(id, &result()).await;

    assert!(matches!(
        saved,
        Err(RepositoryError::NotProcessing {
            current: JobStatus::Failed,
            ..
        })
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_old_processing_rows_when_listing_stale_then_returns_them_with_result_flag() {
    let test_pg = TestPostgres::new().await;
    let repository = &test_pg.job_repository;
    let fresh = test_pg.insert_job(Some("fresh"), None).await;
    let stale = test_pg.insert_job(Some("stale"), None).await;
    for id in [fresh, stale] {
        repository
            .update_status(id, JobStatus::Processing, None)
            .await
            .unwrap();
    }
    repository.save_result(stale, &result()).await.unwrap();
    test_pg.backdate(stale, Duration::from_secs(7200)).await;

    let listed = repository
        .list_stale_processing(Utc::now() - TimeDelta::hours(1))
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, stale);
    assert!(listed[0].has_result);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_missing_row_when_updating_status_then_reports_not_found() {
    let test_pg = TestPostgres::new().await;

    let result = test_pg
        .job_repository
        .update_status(examsmith::domain::JobId::new(999_999), JobStatus::Processing, None)
        .await;

    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
}
