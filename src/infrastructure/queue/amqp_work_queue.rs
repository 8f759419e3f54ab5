use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Consumer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::application::ports::{QueueDelivery, QueueError, WorkQueue};
use crate::infrastructure::retry::{BackoffPolicy, retry_with_backoff};

#[derive(Debug, Clone)]
pub struct AmqpQueueConfig {
    pub url: String,
    pub queue_name: String,
    pub prefetch: u16,
    pub consumer_tag: String,
}

/// RabbitMQ consumer on a durable queue with manual acknowledgment.
pub struct AmqpWorkQueue {
    // Dropping the connection closes the channel and the consumer.
    _connection: Connection,
    channel: Channel,
    consumer: Consumer,
    queue_name: String,
}

impl AmqpWorkQueue {
    #[instrument(skip(config, policy, cancel), fields(queue = %config.queue_name))]
    pub async fn connect(
        config: &AmqpQueueConfig,
        policy: &BackoffPolicy,
        cancel: &CancellationToken,
    ) -> Result<Self, QueueError> {
        let connection = retry_with_backoff("rabbitmq connect", policy, cancel, || {
            Connection::connect(&config.url, tokio_connection_properties())
        })
        .await
        .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| QueueError::Setup(format!("create channel: {e}")))?;

        channel
            .queue_declare(
                &config.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::Setup(format!("declare queue: {e}")))?;

        channel
            .basic_qos(config.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| QueueError::Setup(format!("set prefetch: {e}")))?;

        let consumer = channel
            .basic_consume(
                &config.queue_name,
                &config.consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::Setup(format!("start consumer: {e}")))?;

        info!(
            consumer_tag = %config.consumer_tag,
            prefetch = config.prefetch,
            "Consuming from RabbitMQ"
        );

        Ok(Self {
            _connection: connection,
            channel,
            consumer,
            queue_name: config.queue_name.clone(),
        })
    }
}

/// Runs lapin's I/O on the current tokio runtime instead of its bundled executor.
fn tokio_connection_properties() -> ConnectionProperties {
    ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio)
}

#[async_trait]
impl WorkQueue for AmqpWorkQueue {
    async fn next_delivery(&mut self) -> Result<Option<QueueDelivery>, QueueError> {
        // The broker ends the stream on basic.cancel, queue deletion or failover;
        // the worker must exit non-zero so its supervisor restarts it.
        let Some(delivery) = self.consumer.next().await else {
            error!(queue = %self.queue_name, "RabbitMQ consumer cancelled by broker");
            return Err(QueueError::Consume(format!(
                "consumer stream for queue '{}' ended",
                self.queue_name
            )));
        };
        let delivery = delivery.map_err(|e| QueueError::Consume(e.to_string()))?;

        Ok(Some(QueueDelivery {
            tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            correlation_id: delivery
                .properties
                .correlation_id()
                .as_ref()
                .map(|id| id.as_str().to_string()),
            payload: delivery.data,
        }))
    }

    async fn ack(&mut self, delivery: &QueueDelivery) -> Result<(), QueueError> {
        self.channel
            .basic_ack(delivery.tag, BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::Ack {
                tag: delivery.tag,
                reason: e.to_string(),
            })
    }
}
