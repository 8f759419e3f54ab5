use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::application::ports::{JobMessage, QueueDelivery, QueueError, WorkQueue};

use super::{JobOutcome, JobProcessor};

/// Tally of what a consumer did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub unacked: u64,
}

/// The worker's single sequential consumption loop.
///
/// One delivery is claimed, processed to a final outcome and acknowledged
/// before the next one is requested, so a worker never holds a backlog.
pub struct QueueConsumer<Q: WorkQueue> {
    queue: Q,
    processor: Arc<JobProcessor>,
    shutdown: CancellationToken,
    job_cancel: CancellationToken,
}

impl<Q: WorkQueue> QueueConsumer<Q> {
    /// `shutdown` stops claiming new deliveries; `job_cancel` interrupts the
    /// job in flight and is expected to fire after a grace period.
    pub fn new(
        queue: Q,
        processor: Arc<JobProcessor>,
        shutdown: CancellationToken,
        job_cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            processor,
            shutdown,
            job_cancel,
        }
    }

    pub async fn run(mut self) -> Result<ConsumerStats, QueueError> {
        tracing::info!("Queue consumer started");
        let mut stats = ConsumerStats::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Queue consumer stopping: shutdown requested");
                    break;
                }
                next = self.queue.next_delivery() => next?,
            };

            let Some(delivery) = next else {
                tracing::info!("Queue consumer stopped: queue closed");
                break;
            };

            let span = tracing::info_span!(
                "problem_job",
                delivery_tag = delivery.tag,
                redelivered = delivery.redelivered,
                correlation_id = delivery.correlation_id.as_deref().unwrap_or(""),
                job_id = tracing::field::Empty,
            );
            let acked = self.handle(delivery, &mut stats).instrument(span).await?;
            if !acked {
                // The unacked delivery returns to the queue when the channel
                // closes; claiming more would only stack up further ones.
                tracing::info!("Queue consumer stopping: job interrupted before claim");
                break;
            }
        }

        tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            rejected = stats.rejected,
            "Queue consumer finished"
        );
        Ok(stats)
    }

    async fn handle(
        &mut self,
        delivery: QueueDelivery,
        stats: &mut ConsumerStats,
    ) -> Result<bool, QueueError> {
        let message = match JobMessage::decode(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "Undecodable job message, discarding");
                stats.rejected += 1;
                self.queue.ack(&delivery).await?;
                return Ok(true);
            }
        };

        let job_id = message.job_id();
        tracing::Span::current().record("job_id", job_id.as_i64());
        tracing::info!("Processing job");

        let outcome = self.processor.process(job_id, &self.job_cancel).await;
        match &outcome {
            JobOutcome::Completed { .. } | JobOutcome::CompletionUnconfirmed { .. } => {
                stats.completed += 1
            }
            JobOutcome::Failed(_) | JobOutcome::Aborted { .. } => stats.failed += 1,
            JobOutcome::Skipped { .. } => stats.skipped += 1,
            JobOutcome::Interrupted => stats.unacked += 1,
        }

        if !outcome.should_ack() {
            return Ok(false);
        }

        self.queue.ack(&delivery).await?;
        Ok(true)
    }
}
