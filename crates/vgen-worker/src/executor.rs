//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vgen_queue::{GenerateVideoJob, JobQueue};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::orchestrator::JobOrchestrator;

/// Consumes jobs from the queue and runs them through the orchestrator.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    orchestrator: Arc<JobOrchestrator>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: Arc<JobQueue>, orchestrator: Arc<JobOrchestrator>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue,
            orchestrator,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Consume until [`JobExecutor::shutdown`] is called, then wait for
    /// in-flight jobs up to the shutdown timeout.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("Shutdown timeout reached with jobs still running; they will be reclaimed");
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Periodically take over deliveries abandoned by crashed workers.
    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let orchestrator = Arc::clone(&self.orchestrator);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let available = semaphore.available_permits();
                        if available == 0 {
                            continue;
                        }
                        match queue.claim_pending(&consumer_name, available).await {
                            Ok(jobs) => {
                                if !jobs.is_empty() {
                                    info!("Claimed {} pending jobs", jobs.len());
                                }
                                for (message_id, job) in jobs {
                                    let Ok(permit) = semaphore.clone().acquire_owned().await else {
                                        break;
                                    };
                                    let queue = Arc::clone(&queue);
                                    let orchestrator = Arc::clone(&orchestrator);
                                    let config = config.clone();
                                    let consumer_name = consumer_name.clone();
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(&config, &orchestrator, &queue, &consumer_name, message_id, job).await;
                                    });
                                }
                            }
                            Err(e) => warn!("Failed to claim pending jobs: {}", e),
                        }
                    }
                }
            }
        })
    }

    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;
            let queue = Arc::clone(&self.queue);
            let orchestrator = Arc::clone(&self.orchestrator);
            let config = self.config.clone();
            let consumer_name = self.consumer_name.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(&config, &orchestrator, &queue, &consumer_name, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Run one delivery to a terminal state, then ack or dead-letter it.
    ///
    /// The delivery is refreshed every heartbeat interval while it runs so
    /// other workers do not claim it.
    pub async fn execute_job(
        config: &WorkerConfig,
        orchestrator: &JobOrchestrator,
        queue: &JobQueue,
        consumer_name: &str,
        message_id: String,
        job: GenerateVideoJob,
    ) {
        let job_id = job.job_id.clone();

        // Jobs enqueued without going through the service have no status yet
        match orchestrator.store().get(&job_id).await {
            Ok(None) => {
                if let Err(e) = orchestrator.store().create(&job_id).await {
                    warn!(job_id = %job_id, "Failed to create status: {}", e);
                }
            }
            Ok(Some(status)) if status.is_terminal() => {
                // Redelivered after a lost ack
                info!(job_id = %job_id, state = %status.state, "Job already finished, acknowledging");
                if let Err(e) = queue.ack(&message_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
                return;
            }
            Ok(Some(_)) => {}
            Err(e) => warn!(job_id = %job_id, "Failed to read status: {}", e),
        }

        let outcome = {
            let run = orchestrator.execute(&job, &config.retry, config.job_timeout);
            tokio::pin!(run);
            tokio::select! {
                outcome = &mut run => outcome,
                _ = hold_delivery(queue, consumer_name, &message_id) => run.await,
            }
        };

        match outcome {
            Ok(_) => {
                if let Err(e) = queue.ack(&message_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
            }
            Err(WorkerError::RetriesExhausted { attempts, last_error }) => {
                warn!("Job {} failed after {} attempts, moving to DLQ", job_id, attempts);
                if let Err(e) = queue.dlq(&message_id, &job, &last_error).await {
                    error!("Failed to move job {} to DLQ: {}", job_id, e);
                }
            }
            Err(e) => {
                // Status store unavailable; leave the delivery pending so it is reclaimed
                error!("Job {} interrupted: {}", job_id, e);
            }
        }
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Keep `message_id` claimed by `consumer_name`; returns once ownership is lost.
async fn hold_delivery(queue: &JobQueue, consumer_name: &str, message_id: &str) {
    let mut interval = tokio::time::interval(queue.config().heartbeat_interval);
    // The first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        match queue.touch(consumer_name, message_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(message_id = %message_id, "Delivery no longer held by this worker");
                return;
            }
            Err(e) => warn!(message_id = %message_id, "Failed to refresh delivery: {}", e),
        }
    }
}
