use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{JobRepository, LlmClientError, QueueError, RepositoryError};
use crate::application::services::{
    ConsumerStats, JobProcessor, ProblemGenerator, QueueConsumer, StaleJobReaper,
    StructureExtractor,
};
use crate::infrastructure::llm::{GeminiClient, GeminiClientConfig};
use crate::infrastructure::persistence::{PgJobRepository, create_pool, run_migrations};
use crate::infrastructure::queue::{AmqpQueueConfig, AmqpWorkQueue};

use super::config::Settings;
use super::shutdown::cancel_after_grace;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("job store unavailable: {0}")]
    Repository(#[from] RepositoryError),
    #[error("work queue unavailable: {0}")]
    Queue(#[from] QueueError),
    #[error("model client setup failed: {0}")]
    Llm(#[from] LlmClientError),
}

/// Builds the worker's dependencies from `settings` and consumes until `shutdown`.
///
/// Startup connections retry with backoff; once they are exhausted the error
/// is returned and the process is expected to exit.
pub async fn run_worker(
    settings: &Settings,
    worker_id: &str,
    shutdown: CancellationToken,
) -> Result<ConsumerStats, WorkerError> {
    let backoff = settings.backoff_policy();

    let pool = create_pool(
        &settings.database.url,
        settings.database.max_connections,
        &backoff,
        &shutdown,
    )
    .await?;
    if settings.database.run_migrations {
        run_migrations(&pool).await?;
    }
    let job_repository: Arc<dyn JobRepository> = Arc::new(PgJobRepository::new(pool));

    let structuring_client =
        GeminiClient::new(gemini_config(settings, &settings.gemini.structuring_model))?;
    let generation_client =
        GeminiClient::new(gemini_config(settings, &settings.gemini.generation_model))?;

    let processor = Arc::new(JobProcessor::new(
        Arc::clone(&job_repository),
        StructureExtractor::new(Arc::new(structuring_client)),
        ProblemGenerator::new(Arc::new(generation_client)),
        settings.processor_config(),
    ));

    let queue = AmqpWorkQueue::connect(
        &AmqpQueueConfig {
            url: settings.queue.url.clone(),
            queue_name: settings.queue.queue_name.clone(),
            prefetch: settings.queue.prefetch,
            consumer_tag: worker_id.to_string(),
        },
        &backoff,
        &shutdown,
    )
    .await?;

    let reaper = StaleJobReaper::new(Arc::clone(&job_repository), settings.reaper_config());
    let reaper_handle = tokio::spawn(reaper.run(shutdown.clone()));

    let job_cancel = CancellationToken::new();
    let grace_handle = tokio::spawn(cancel_after_grace(
        shutdown.clone(),
        job_cancel.clone(),
        settings.shutdown_grace(),
    ));

    let result = QueueConsumer::new(queue, processor, shutdown.clone(), job_cancel.clone())
        .run()
        .await;

    // Nothing is in flight any more; release the background tasks.
    job_cancel.cancel();
    shutdown.cancel();
    if let Err(e) = grace_handle.await {
        tracing::warn!(error = %e, "Grace timer task ended abnormally");
    }
    if let Err(e) = reaper_handle.await {
        tracing::warn!(error = %e, "Stale job reaper task ended abnormally");
    }

    Ok(result?)
}

fn gemini_config(settings: &Settings, model: &str) -> GeminiClientConfig {
    GeminiClientConfig {
        api_key: settings.gemini.api_key.clone(),
        base_url: settings.gemini.base_url.clone(),
        model: model.to_string(),
        request_timeout: settings.gemini_request_timeout(),
    }
}
