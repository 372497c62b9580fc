//! Job payloads carried by the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vgen_models::{GenerationRequest, JobId};

/// Job to turn one prompt into a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateVideoJob {
    /// Unique job ID, also the artifact directory name
    pub job_id: JobId,
    /// The accepted request; never modified after submission
    pub request: GenerationRequest,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl GenerateVideoJob {
    /// Create a job with a fresh ID.
    pub fn new(request: GenerationRequest) -> Self {
        Self::with_id(JobId::new(), request)
    }

    pub fn with_id(job_id: JobId, request: GenerationRequest) -> Self {
        Self {
            job_id,
            request,
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("generate:{}", self.job_id)
    }
}
