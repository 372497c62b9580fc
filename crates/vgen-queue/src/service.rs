//! Submit and observe operations exposed to callers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use validator::Validate;
use vgen_models::{GenerationRequest, JobId, JobStatusSnapshot};

use crate::error::{QueueError, QueueResult};
use crate::job::GenerateVideoJob;
use crate::queue::JobQueue;
use crate::status::StatusStore;

/// Entry point for callers: submit a request, then poll its status.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Accept a request and schedule it. Returns without waiting for the job.
    async fn submit(&self, request: GenerationRequest) -> QueueResult<JobId>;

    /// Latest snapshot, or `None` for an unknown job.
    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>>;
}

/// Validate a request before it is accepted.
pub fn validate_request(request: &GenerationRequest) -> QueueResult<()> {
    request
        .validate()
        .map_err(|e| QueueError::invalid_request(e.to_string()))
}

/// [`JobService`] backed by the Redis stream and a status store.
pub struct QueueJobService {
    queue: Arc<JobQueue>,
    store: Arc<dyn StatusStore>,
}

impl QueueJobService {
    pub fn new(queue: Arc<JobQueue>, store: Arc<dyn StatusStore>) -> Self {
        Self { queue, store }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }
}

#[async_trait]
impl JobService for QueueJobService {
    async fn submit(&self, request: GenerationRequest) -> QueueResult<JobId> {
        validate_request(&request)?;

        let job = GenerateVideoJob::new(request);
        // Status exists before the job is visible to workers
        self.store.create(&job.job_id).await?;
        self.queue.enqueue(&job).await?;

        info!(job_id = %job.job_id, "Job submitted");
        Ok(job.job_id)
    }

    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        self.store.get(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_prompt_is_invalid_request() {
        let err = validate_request(&GenerationRequest::new("  ")).unwrap_err();
        assert!(matches!(err, QueueError::InvalidRequest(_)));
        assert!(validate_request(&GenerationRequest::new("space exploration")).is_ok());
    }
}
