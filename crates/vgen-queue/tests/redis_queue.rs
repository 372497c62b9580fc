//! Queue and status store against a live Redis.
//!
//! Run with `REDIS_URL=redis://localhost:6379 cargo test -p vgen-queue -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use vgen_models::{GenerationRequest, JobStage};
use vgen_queue::{
    GenerateVideoJob, JobQueue, JobService, QueueConfig, QueueJobService, RedisStatusStore,
    StatusStore,
};

fn test_config() -> QueueConfig {
    let _ = dotenvy::dotenv();
    let suffix = uuid_suffix();
    QueueConfig {
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into()),
        stream_name: format!("vgen:test:jobs:{suffix}"),
        consumer_group: format!("vgen:test:workers:{suffix}"),
        dlq_stream_name: format!("vgen:test:dlq:{suffix}"),
        ..QueueConfig::default()
    }
}

fn uuid_suffix() -> String {
    vgen_models::JobId::new().to_string()
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_enqueue_consume_ack() {
    let queue = JobQueue::new(test_config()).unwrap();
    queue.init().await.unwrap();

    let job = GenerateVideoJob::new(GenerationRequest::new("space exploration"));
    queue.enqueue(&job).await.unwrap();
    assert!(queue.enqueue(&job).await.is_err(), "duplicate must be rejected");

    let delivered = queue.consume("consumer-1", 1000, 10).await.unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].1, job);

    queue.ack(&delivered[0].0).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dlq_moves_job() {
    let queue = JobQueue::new(test_config()).unwrap();
    queue.init().await.unwrap();

    let job = GenerateVideoJob::new(GenerationRequest::new("deep sea"));
    queue.enqueue(&job).await.unwrap();
    let delivered = queue.consume("consumer-1", 1000, 1).await.unwrap();
    queue.dlq(&delivered[0].0, &job, "mux failed").await.unwrap();

    assert_eq!(queue.len().await.unwrap(), 0);
    assert_eq!(queue.dlq_len().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_submit_creates_queued_status() {
    let queue = Arc::new(JobQueue::new(test_config()).unwrap());
    queue.init().await.unwrap();
    let store = Arc::new(RedisStatusStore::new(queue.client().clone()));
    let service = QueueJobService::new(queue.clone(), store.clone());

    let job_id = service.submit(GenerationRequest::new("volcanoes")).await.unwrap();
    let status = service.status(&job_id).await.unwrap().unwrap();
    assert_eq!(status.state, JobStage::Queued);

    store.update_stage(&job_id, JobStage::MediaReady).await.unwrap();
    store.update_stage(&job_id, JobStage::Accepted).await.unwrap();
    let status = service.status(&job_id).await.unwrap().unwrap();
    assert_eq!(status.progress, 50);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_touch_keeps_delivery_from_being_claimed() {
    let queue = JobQueue::new(QueueConfig {
        visibility_timeout: Duration::from_millis(1500),
        heartbeat_interval: Duration::from_millis(500),
        ..test_config()
    })
    .unwrap();
    queue.init().await.unwrap();

    let job = GenerateVideoJob::new(GenerationRequest::new("northern lights"));
    queue.enqueue(&job).await.unwrap();
    let delivered = queue.consume("worker-a", 1000, 1).await.unwrap();
    let message_id = delivered[0].0.clone();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(queue.touch("worker-a", &message_id).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1000)).await;

    // Held for 2s in total but idle for only 1s
    assert!(queue.claim_pending("worker-b", 10).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(700)).await;
    let claimed = queue.claim_pending("worker-b", 10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].1, job);

    // A worker that lost the delivery does not take it back
    assert!(!queue.touch("worker-a", &message_id).await.unwrap());
}
