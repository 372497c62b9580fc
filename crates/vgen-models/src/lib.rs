//! Shared data models for the video generation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests and their upload destinations
//! - Script data (narration, visual cues, subtitle cues)
//! - Media artifacts and job results
//! - Job identifiers, pipeline stages and status snapshots
//! - SRT timestamp formatting

pub mod job;
pub mod media;
pub mod request;
pub mod script;
pub mod status;
pub mod timestamp;

// Re-export common types
pub use job::{JobId, JobStage};
pub use media::{JobResult, MediaArtifacts, UploadUrls};
pub use request::{GenerationRequest, Platform, UploadFlags};
pub use script::{ScriptData, ScriptError, SubtitleCue, VisualCue};
pub use status::JobStatusSnapshot;
pub use timestamp::format_srt_timestamp;
