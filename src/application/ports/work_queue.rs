use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::JobId;

/// Wire payload published by ingress: `{"problem_id": 42}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub problem_id: i64,
}

impl JobMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn encode(&self) -> Vec<u8> {
        // A struct with a single integer field always serializes.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn job_id(&self) -> JobId {
        JobId::new(self.problem_id)
    }
}

/// A claimed, not yet acknowledged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDelivery {
    pub tag: u64,
    pub payload: Vec<u8>,
    pub redelivered: bool,
    pub correlation_id: Option<String>,
}

/// At-least-once queue with manual acknowledgment.
///
/// Implementations hold at most one unacknowledged delivery per consumer.
#[async_trait]
pub trait WorkQueue: Send {
    /// Waits for the next delivery.
    ///
    /// `None` means the queue was closed on purpose and the consumer may stop
    /// cleanly. Losing a broker-side consumer is an error, not `None`.
    async fn next_delivery(&mut self) -> Result<Option<QueueDelivery>, QueueError>;

    async fn ack(&mut self, delivery: &QueueDelivery) -> Result<(), QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("consume failed: {0}")]
    Consume(String),
    #[error("ack failed for delivery {tag}: {reason}")]
    Ack { tag: u64, reason: String },
}
