use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEvent {
    CtrlC,
    SigTerm,
    ListenerFailed,
}

/// Resolves on SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() -> ShutdownEvent {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownEvent::CtrlC,
            Err(error) => {
                tracing::warn!(%error, "failed to capture Ctrl+C signal");
                ShutdownEvent::ListenerFailed
            }
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => match term.recv().await {
                Some(_) => ShutdownEvent::SigTerm,
                None => ShutdownEvent::ListenerFailed,
            },
            Err(error) => {
                tracing::warn!(%error, "failed to capture SIGTERM");
                ShutdownEvent::ListenerFailed
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending();

    tokio::select! {
        event = ctrl_c => event,
        event = sigterm => event,
    }
}

/// Fires `job_cancel` once `grace` has passed after `shutdown`.
///
/// Returns early, without firing, if `job_cancel` is cancelled by someone else first.
pub async fn cancel_after_grace(
    shutdown: CancellationToken,
    job_cancel: CancellationToken,
    grace: Duration,
) {
    tokio::select! {
        _ = job_cancel.cancelled() => return,
        _ = shutdown.cancelled() => {}
    }

    tracing::info!(
        grace_secs = grace.as_secs(),
        "Shutdown requested, waiting for the in-flight job"
    );

    tokio::select! {
        _ = job_cancel.cancelled() => {}
        _ = tokio::time::sleep(grace) => {
            tracing::warn!("Grace period elapsed, cancelling the in-flight job");
            job_cancel.cancel();
        }
    }
}
