use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{
    ExamMeta, GeneratedExam, Job, JobId, JobInput, JobResult, JobStatus, MajorSection,
    ProblemStructure, StaleJob, StructureBody, TokenUsage,
};

const STALE_BATCH_LIMIT: i64 = 1000;

const TRANSITION_STATEMENT: &str = r#"
    UPDATE problems
    SET processing_status = $1, error_message = $2, updated_at = NOW()
    WHERE id = $3 AND processing_status = ANY($4)
"#;

// A failed job never carries result columns, even if a result write landed late.
const FAIL_STATEMENT: &str = r#"
    UPDATE problems
    SET processing_status = $1, error_message = $2, updated_at = NOW(),
        exam_title = NULL, duration_minutes = NULL, is_open_book = NULL,
        allowed_materials = NULL, question_format_is_latex = NULL,
        answer_format_is_latex = NULL, major_sections = NULL, generated_questions = NULL,
        structure_prompt_tokens = NULL, structure_candidates_tokens = NULL,
        generation_prompt_tokens = NULL, generation_candidates_tokens = NULL
    WHERE id = $3 AND processing_status = ANY($4)
"#;

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_status(&self, id: JobId) -> Result<Option<JobStatus>, RepositoryError> {
        let row = sqlx::query("SELECT processing_status FROM problems WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        match row {
            Some(r) => {
                let status: String = r.try_get("processing_status").map_err(corrupt_row)?;
                status
                    .parse::<JobStatus>()
                    .map(Some)
                    .map_err(RepositoryError::CorruptRow)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, processing_status, error_message,
                   exam_title, duration_minutes, is_open_book, allowed_materials,
                   question_format_is_latex, answer_format_is_latex, major_sections,
                   generated_questions,
                   structure_prompt_tokens, structure_candidates_tokens,
                   generation_prompt_tokens, generation_candidates_tokens,
                   created_at, updated_at
            FROM problems
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed)?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_input(&self, id: JobId) -> Result<JobInput, RepositoryError> {
        let row = sqlx::query("SELECT raw_input_text, raw_input_file FROM problems WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?
            .ok_or(RepositoryError::NotFound(id))?;

        let text: Option<String> = row.try_get("raw_input_text").map_err(corrupt_row)?;
        let file: Option<Vec<u8>> = row.try_get("raw_input_file").map_err(corrupt_row)?;

        JobInput::from_columns(text, file)
            .map_err(|source| RepositoryError::InvalidInput { id, source })
    }

    #[instrument(skip(self, error_message), fields(job_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let statement = if status == JobStatus::Failed {
            FAIL_STATEMENT
        } else {
            TRANSITION_STATEMENT
        };

        let result = sqlx::query(statement)
            .bind(status.as_str())
            .bind(error_message)
            .bind(id.as_i64())
            .bind(status_labels(status.predecessors()))
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.fetch_status(id).await? {
            Some(from) => Err(RepositoryError::InvalidTransition { from, to: status }),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    #[instrument(skip(self, result), fields(job_id = %id))]
    async fn save_result(&self, id: JobId, result: &JobResult) -> Result<(), RepositoryError> {
        let meta = &result.structure.exam_meta;
        let usage = &result.token_usage;

        let outcome = sqlx::query(
            r#"
            UPDATE problems SET
                exam_title = $1, duration_minutes = $2, is_open_book = $3, allowed_materials = $4,
                question_format_is_latex = $5, answer_format_is_latex = $6, major_sections = $7,
                generated_questions = $8,
                structure_prompt_tokens = $9, structure_candidates_tokens = $10,
                generation_prompt_tokens = $11, generation_candidates_tokens = $12,
                updated_at = NOW()
            WHERE id = $13 AND processing_status = 'processing'
            "#,
        )
        .bind(meta.exam_title.as_str())
        .bind(meta.exam_duration)
        .bind(meta.open_book)
        .bind(meta.allowed_materials.as_slice())
        .bind(meta.question_format_is_latex)
        .bind(meta.answer_format_is_latex)
        .bind(Json(&result.structure.structure.major_sections))
        .bind(Json(&result.generated))
        .bind(i64::from(usage.structure_prompt_tokens))
        .bind(i64::from(usage.structure_candidates_tokens))
        .bind(i64::from(usage.generation_prompt_tokens))
        .bind(i64::from(usage.generation_candidates_tokens))
        .bind(id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        if outcome.rows_affected() > 0 {
            return Ok(());
        }

        match self.fetch_status(id).await? {
            Some(current) => Err(RepositoryError::NotProcessing { id, current }),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    #[instrument(skip(self))]
    async fn list_stale_processing(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StaleJob>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, generated_questions IS NOT NULL AS has_result, updated_at
            FROM problems
            WHERE processing_status = 'processing' AND updated_at <= $1
            ORDER BY updated_at
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(STALE_BATCH_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter()
            .map(|r| {
                Ok(StaleJob {
                    id: JobId::new(r.try_get("id").map_err(corrupt_row)?),
                    has_result: r.try_get("has_result").map_err(corrupt_row)?,
                    updated_at: r.try_get("updated_at").map_err(corrupt_row)?,
                })
            })
            .collect()
    }
}

/// Storage labels accepted for each predecessor; `queued` also matches legacy `pending`.
fn status_labels(statuses: &[JobStatus]) -> Vec<String> {
    let mut labels = Vec::with_capacity(statuses.len() + 1);
    for status in statuses {
        labels.push(status.as_str().to_string());
        if *status == JobStatus::Queued {
            labels.push("pending".to_string());
        }
    }
    labels
}

fn job_from_row(r: &PgRow) -> Result<Job, RepositoryError> {
    let status: String = r.try_get("processing_status").map_err(corrupt_row)?;
    let status = status
        .parse::<JobStatus>()
        .map_err(RepositoryError::CorruptRow)?;

    let sections: Option<Json<Vec<MajorSection>>> =
        r.try_get("major_sections").map_err(corrupt_row)?;
    let structure = match sections {
        Some(Json(major_sections)) => Some(ProblemStructure {
            exam_meta: ExamMeta {
                exam_title: r
                    .try_get::<Option<String>, _>("exam_title")
                    .map_err(corrupt_row)?
                    .unwrap_or_default(),
                exam_duration: r.try_get("duration_minutes").map_err(corrupt_row)?,
                open_book: r
                    .try_get::<Option<bool>, _>("is_open_book")
                    .map_err(corrupt_row)?
                    .unwrap_or(false),
                allowed_materials: r
                    .try_get::<Option<Vec<String>>, _>("allowed_materials")
                    .map_err(corrupt_row)?
                    .unwrap_or_default(),
                question_format_is_latex: r
                    .try_get::<Option<bool>, _>("question_format_is_latex")
                    .map_err(corrupt_row)?
                    .unwrap_or(false),
                answer_format_is_latex: r
                    .try_get::<Option<bool>, _>("answer_format_is_latex")
                    .map_err(corrupt_row)?
                    .unwrap_or(false),
            },
            structure: StructureBody { major_sections },
        }),
        None => None,
    };

    let generated: Option<Json<GeneratedExam>> =
        r.try_get("generated_questions").map_err(corrupt_row)?;

    let token_usage = match r
        .try_get::<Option<i64>, _>("structure_prompt_tokens")
        .map_err(corrupt_row)?
    {
        Some(structure_prompt) => Some(TokenUsage {
            structure_prompt_tokens: to_counter(structure_prompt)?,
            structure_candidates_tokens: counter_column(r, "structure_candidates_tokens")?,
            generation_prompt_tokens: counter_column(r, "generation_prompt_tokens")?,
            generation_candidates_tokens: counter_column(r, "generation_candidates_tokens")?,
        }),
        None => None,
    };

    Ok(Job {
        id: JobId::new(r.try_get("id").map_err(corrupt_row)?),
        status,
        error_message: r.try_get("error_message").map_err(corrupt_row)?,
        structure,
        generated_output: generated.map(|Json(exam)| exam),
        token_usage,
        created_at: r.try_get("created_at").map_err(corrupt_row)?,
        updated_at: r.try_get("updated_at").map_err(corrupt_row)?,
    })
}

fn counter_column(r: &PgRow, column: &str) -> Result<u32, RepositoryError> {
    let value: Option<i64> = r.try_get(column).map_err(corrupt_row)?;
    to_counter(value.unwrap_or(0))
}

fn to_counter(value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::CorruptRow(format!("token counter out of range: {value}")))
}

fn query_failed(e: sqlx::Error) -> RepositoryError {
    RepositoryError::QueryFailed(e.to_string())
}

fn corrupt_row(e: sqlx::Error) -> RepositoryError {
    RepositoryError::CorruptRow(e.to_string())
}
