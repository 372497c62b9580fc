//! In-process job service: no Redis, jobs run on spawned tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;
use vgen_models::{GenerationRequest, JobId, JobStatusSnapshot};
use vgen_queue::{
    validate_request, GenerateVideoJob, JobService, MemoryStatusStore, QueueError, QueueResult,
    StatusStore,
};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::orchestrator::{JobOrchestrator, Pipeline};
use crate::retry::RetryConfig;

pub struct LocalJobService {
    orchestrator: Arc<JobOrchestrator>,
    store: Arc<MemoryStatusStore>,
    retry: RetryConfig,
    job_timeout: Duration,
}

impl LocalJobService {
    /// Service running the production pipeline.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        Ok(Self::new(Pipeline::from_config(config)?, config))
    }

    pub fn new(pipeline: Pipeline, config: &WorkerConfig) -> Self {
        let store = Arc::new(MemoryStatusStore::new());
        let orchestrator = Arc::new(JobOrchestrator::new(
            pipeline,
            store.clone(),
            config.work_dir.clone(),
        ));
        Self {
            orchestrator,
            store,
            retry: config.retry.clone(),
            job_timeout: config.job_timeout,
        }
    }

    pub fn store(&self) -> &MemoryStatusStore {
        &self.store
    }

    /// Poll until the job is done or failed.
    pub async fn wait_for_terminal(
        &self,
        job_id: &JobId,
        poll_interval: Duration,
    ) -> QueueResult<JobStatusSnapshot> {
        loop {
            match self.store.get(job_id).await? {
                Some(status) if status.is_terminal() => return Ok(status),
                Some(_) => tokio::time::sleep(poll_interval).await,
                None => return Err(QueueError::JobNotFound(job_id.to_string())),
            }
        }
    }
}

#[async_trait]
impl JobService for LocalJobService {
    async fn submit(&self, request: GenerationRequest) -> QueueResult<JobId> {
        validate_request(&request)?;

        let job = GenerateVideoJob::new(request);
        let job_id = job.job_id.clone();
        self.store.create(&job_id).await?;

        let orchestrator = Arc::clone(&self.orchestrator);
        let retry = self.retry.clone();
        let job_timeout = self.job_timeout;
        tokio::spawn(async move {
            if let Err(e) = orchestrator.execute(&job, &retry, job_timeout).await {
                error!(job_id = %job.job_id, "Local job failed: {}", e);
            }
        });

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        self.store.get(job_id).await
    }
}
