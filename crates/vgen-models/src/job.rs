//! Job identifiers and pipeline stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a generation job.
///
/// Every artifact a job writes lives under a directory named after its id,
/// so redelivered jobs overwrite their own files and never collide with others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Position of a job in the generation pipeline.
///
/// The non-terminal variants are ordered; each one carries the progress
/// checkpoint reported once the corresponding stage has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Submitted, waiting for a worker
    #[default]
    Queued,
    /// Picked up by the orchestrator
    Accepted,
    /// Script (narration, cues) available
    ScriptReady,
    /// Audio, clips and subtitles available
    MediaReady,
    /// Final video assembled
    Assembled,
    /// Uploads attempted, or skipped when none were requested
    Published,
    /// Result recorded
    Done,
    /// Terminal failure after retries were exhausted
    Failed,
}

impl JobStage {
    /// Progress checkpoint for this stage.
    ///
    /// `Failed` has no checkpoint of its own; the store keeps whatever
    /// progress was last reached.
    pub fn progress(&self) -> Option<u8> {
        match self {
            JobStage::Queued => Some(0),
            JobStage::Accepted => Some(10),
            JobStage::ScriptReady => Some(25),
            JobStage::MediaReady => Some(50),
            JobStage::Assembled => Some(75),
            JobStage::Published => Some(90),
            JobStage::Done => Some(100),
            JobStage::Failed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Accepted => "accepted",
            JobStage::ScriptReady => "script_ready",
            JobStage::MediaReady => "media_ready",
            JobStage::Assembled => "assembled",
            JobStage::Published => "published",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
