//! Observable job status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStage};
use crate::media::JobResult;

/// Latest known state of a job, as returned to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusSnapshot {
    pub job_id: JobId,
    pub state: JobStage,
    /// Non-decreasing within [0, 100]
    pub progress: u8,
    /// Executions started so far (1 on the first run)
    #[serde(default)]
    pub attempts: u32,
    /// Last fatal error, kept after a retry succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present only once the job is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusSnapshot {
    /// Snapshot for a freshly submitted job.
    pub fn queued(job_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            state: JobStage::Queued,
            progress: 0,
            attempts: 0,
            error: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `stage`, never lowering progress.
    pub fn advance(&mut self, stage: JobStage) {
        self.state = stage;
        if let Some(p) = stage.progress() {
            self.progress = self.progress.max(p.min(100));
        }
        self.updated_at = Utc::now();
    }

    /// Record the successful result and mark the job done.
    pub fn complete(&mut self, result: JobResult) {
        self.advance(JobStage::Done);
        self.result = Some(result);
    }

    /// Mark the job failed with the given cause.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.advance(JobStage::Failed);
        self.error = Some(error.into());
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let mut status = JobStatusSnapshot::queued(JobId::from_string("j"));
        status.advance(JobStage::MediaReady);
        assert_eq!(status.progress, 50);

        // A retry starts over from the first stage
        status.advance(JobStage::Accepted);
        assert_eq!(status.state, JobStage::Accepted);
        assert_eq!(status.progress, 50);

        status.fail("mux failed");
        assert_eq!(status.progress, 50);
        assert!(status.is_terminal());
        assert_eq!(status.error.as_deref(), Some("mux failed"));
    }

    #[test]
    fn test_queued_snapshot_omits_result() {
        let status = JobStatusSnapshot::queued(JobId::from_string("j"));
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["state"], "queued");
        assert_eq!(value["progress"], 0);
        assert!(value.get("result").is_none());
    }
}
