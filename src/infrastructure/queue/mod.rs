mod amqp_work_queue;
mod in_memory_work_queue;

pub use amqp_work_queue::{AmqpQueueConfig, AmqpWorkQueue};
pub use in_memory_work_queue::{InMemoryWorkQueue, QueuePublisher};
