use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::ports::{JobMessage, QueueDelivery, QueueError, WorkQueue};

/// Channel-backed queue that keeps a ledger of what was delivered and acked.
pub struct InMemoryWorkQueue {
    receiver: mpsc::UnboundedReceiver<QueueDelivery>,
    ledger: Arc<Mutex<Ledger>>,
}

/// Producer side of an [`InMemoryWorkQueue`]. Dropping every publisher closes the queue.
#[derive(Clone)]
pub struct QueuePublisher {
    sender: mpsc::UnboundedSender<QueueDelivery>,
    ledger: Arc<Mutex<Ledger>>,
}

#[derive(Default)]
struct Ledger {
    next_tag: u64,
    delivered: Vec<u64>,
    acked: Vec<u64>,
}

impl InMemoryWorkQueue {
    pub fn new() -> (QueuePublisher, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        (
            QueuePublisher {
                sender,
                ledger: Arc::clone(&ledger),
            },
            Self { receiver, ledger },
        )
    }
}

impl QueuePublisher {
    pub fn publish(&self, message: JobMessage) -> u64 {
        self.publish_raw(message.encode(), false)
    }

    /// Publishes an arbitrary payload, optionally flagged as a redelivery.
    pub fn publish_raw(&self, payload: Vec<u8>, redelivered: bool) -> u64 {
        let tag = {
            let mut ledger = lock(&self.ledger);
            ledger.next_tag += 1;
            ledger.next_tag
        };
        // The receiver may already be gone; the tag then never shows up as delivered.
        let _ = self.sender.send(QueueDelivery {
            tag,
            payload,
            redelivered,
            correlation_id: None,
        });
        tag
    }

    pub fn acked_tags(&self) -> Vec<u64> {
        lock(&self.ledger).acked.clone()
    }

    /// Tags handed to the consumer but never acknowledged.
    pub fn unacked_tags(&self) -> Vec<u64> {
        let ledger = lock(&self.ledger);
        ledger
            .delivered
            .iter()
            .copied()
            .filter(|tag| !ledger.acked.contains(tag))
            .collect()
    }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn next_delivery(&mut self) -> Result<Option<QueueDelivery>, QueueError> {
        let delivery = self.receiver.recv().await;
        if let Some(delivery) = &delivery {
            lock(&self.ledger).delivered.push(delivery.tag);
        }
        Ok(delivery)
    }

    async fn ack(&mut self, delivery: &QueueDelivery) -> Result<(), QueueError> {
        let mut ledger = lock(&self.ledger);
        if ledger.acked.contains(&delivery.tag) {
            return Err(QueueError::Ack {
                tag: delivery.tag,
                reason: "already acknowledged".to_string(),
            });
        }
        ledger.acked.push(delivery.tag);
        Ok(())
    }
}
