//! Media artifacts and job results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::job::JobId;
use crate::request::Platform;
use crate::script::ScriptData;

/// Published video URL per platform. Platforms whose upload failed are absent.
pub type UploadUrls = BTreeMap<Platform, String>;

/// Files produced by the media stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaArtifacts {
    pub audio_path: PathBuf,
    /// One clip per visual cue, in cue order
    pub clip_paths: Vec<PathBuf>,
    pub subtitle_path: PathBuf,
}

/// Outcome of a successful job. Produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub success: bool,
    pub job_id: JobId,
    pub final_video_path: PathBuf,
    #[serde(default)]
    pub upload_urls: UploadUrls,
    pub script_data: ScriptData,
    pub media_files: MediaArtifacts,
    pub completed_at: DateTime<Utc>,
}
