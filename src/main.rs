use anyhow::Context;
use tokio_util::sync::CancellationToken;

use examsmith::infrastructure::observability::init_tracing;
use examsmith::presentation::{Environment, Settings, run_worker, wait_for_shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("failed to load settings")?;

    let worker_id = format!("examsmith-worker-{}", uuid::Uuid::new_v4());
    init_tracing(&settings.tracing_config(environment), &worker_id);

    let shutdown = CancellationToken::new();
    let signal_listener = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let event = wait_for_shutdown_signal().await;
            tracing::info!(?event, "Shutdown signal received");
            shutdown.cancel();
        })
    };

    let stats = run_worker(&settings, &worker_id, shutdown)
        .await
        .context("worker stopped with an error")?;
    signal_listener.abort();

    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        skipped = stats.skipped,
        rejected = stats.rejected,
        unacked = stats.unacked,
        "Worker exited"
    );
    Ok(())
}
