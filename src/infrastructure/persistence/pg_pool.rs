use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::application::ports::RepositoryError;
use crate::infrastructure::retry::{BackoffPolicy, retry_with_backoff};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[instrument(skip(url, policy, cancel))]
pub async fn create_pool(
    url: &str,
    max_connections: u32,
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
) -> Result<PgPool, RepositoryError> {
    let pool = retry_with_backoff("postgres connect", policy, cancel, || {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
    })
    .await
    .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(format!("migration failed: {e}")))?;
    info!("Database migrations applied");
    Ok(())
}
