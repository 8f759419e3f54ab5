use examsmith::application::ports::{JobMessage, QueueError, WorkQueue};
use examsmith::infrastructure::queue::InMemoryWorkQueue;

#[tokio::test]
async fn given_published_message_when_receiving_then_payload_decodes_to_job_id() {
    let (publisher, mut queue) = InMemoryWorkQueue::new();
    publisher.publish(JobMessage { problem_id: 42 });

    let delivery = queue.next_delivery().await.unwrap().unwrap();

    assert_eq!(delivery.payload, br#"{"problem_id":42}"#.to_vec());
    assert_eq!(JobMessage::decode(&delivery.payload).unwrap().problem_id, 42);
    assert!(!delivery.redelivered);
}

#[tokio::test]
async fn given_delivery_when_acking_twice_then_second_ack_fails() {
    let (publisher, mut queue) = InMemoryWorkQueue::new();
    publisher.publish(JobMessage { problem_id: 1 });
    let delivery = queue.next_delivery().await.unwrap().unwrap();

    queue.ack(&delivery).await.unwrap();
    let second = queue.ack(&delivery).await;

    assert!(matches!(second, Err(QueueError::Ack { .. })));
    assert_eq!(publisher.acked_tags(), vec![delivery.tag]);
}

#[tokio::test]
async fn given_all_publishers_dropped_when_receiving_then_queue_reports_closed() {
    let (publisher, mut queue) = InMemoryWorkQueue::new();
    drop(publisher);

    assert_eq!(queue.next_delivery().await.unwrap(), None);
}
