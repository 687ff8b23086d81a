use super::SubmissionQueue;
use crate::server::{
    broker::{BrokerFlush, PublishPolicy},
    testing::MemoryPublisher,
};
use core::time::Duration;
use hashgate_core::{Coalescer, CoalescerConfig, Error, HashResponse};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn response(i: usize) -> HashResponse {
    HashResponse::new(format!("client-{i}"), format!("hash-{i}"))
}

fn queue(window: Duration, buffer: usize) -> (SubmissionQueue, Arc<MemoryPublisher>) {
    let publisher = Arc::new(MemoryPublisher::default());
    let flush = BrokerFlush::new(
        publisher.clone(),
        PublishPolicy::default(),
        CancellationToken::new(),
    );
    let coalescer = Coalescer::new(CoalescerConfig::new(window), flush);
    (SubmissionQueue::new(coalescer, buffer), publisher)
}

fn published(publisher: &MemoryPublisher) -> Vec<Vec<HashResponse>> {
    publisher
        .bodies()
        .iter()
        .map(|body| serde_json::from_slice(body).unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn queued_responses_are_published_in_one_batch() {
    let (queue, publisher) = queue(Duration::from_millis(50), 16);

    for i in 0..3 {
        queue.enqueue(response(i)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(published(&publisher), vec![vec![response(0), response(1), response(2)]]);
}

#[tokio::test(start_paused = true)]
async fn full_queue_drops_without_waiting() {
    let (queue, _publisher) = queue(Duration::from_millis(50), 1);

    // The supervisor has not run yet on this single-threaded runtime.
    queue.enqueue(response(0)).unwrap();
    let dropped = queue.enqueue(response(1));

    assert!(matches!(dropped, Err(Error::ChannelError { .. })));
}

#[tokio::test(start_paused = true)]
async fn shutdown_publishes_queued_responses_before_the_deadline() {
    let (queue, publisher) = queue(Duration::from_secs(60), 16);

    queue.enqueue(response(0)).unwrap();
    queue.enqueue(response(1)).unwrap();
    queue.shutdown().await.unwrap();

    assert_eq!(published(&publisher), vec![vec![response(0), response(1)]]);
    assert!(matches!(
        queue.enqueue(response(2)),
        Err(Error::ServiceShutdown)
    ));

    // Idempotent.
    queue.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn publish_failures_do_not_stop_the_dispatcher() {
    let publisher = Arc::new(MemoryPublisher::failing_first(1));
    let policy = PublishPolicy {
        max_attempts: 1,
        fatal: false,
        ..PublishPolicy::default()
    };
    let flush = BrokerFlush::new(publisher.clone(), policy, CancellationToken::new());
    let coalescer = Coalescer::new(CoalescerConfig::new(Duration::from_millis(10)), flush);
    let queue = SubmissionQueue::new(coalescer, 16);

    queue.enqueue(response(0)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.enqueue(response(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(publisher.attempts(), 2);
    assert_eq!(published(&publisher), vec![vec![response(1)]]);
}
