//! Worker error types.
//!
//! A `WorkerError` is always fatal for the current attempt: degradable
//! failures are absorbed by the stage adapters before they get here.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// A stage fallback could not produce its output.
    #[error("{stage} fallback failed: {message}")]
    FallbackFailed { stage: &'static str, message: String },

    #[error("Job timed out after {0}s")]
    Timeout(u64),

    #[error("Job failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] vgen_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vgen_queue::QueueError),

    #[error("Service error: {0}")]
    Service(#[from] vgen_ai_client::ExternalServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn fallback_failed(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::FallbackFailed {
            stage,
            message: msg.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            WorkerError::RetriesExhausted { .. } | WorkerError::ConfigError(_)
        )
    }
}
