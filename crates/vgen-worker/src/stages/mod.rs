//! The four pipeline stages.
//!
//! Each stage is a trait so the orchestrator can be driven by test doubles.
//! The production implementations wrap one or more [`StageAdapter`]s.
//!
//! [`StageAdapter`]: crate::adapter::StageAdapter

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use vgen_ai_client::UploadMetadata;
use vgen_models::{JobId, MediaArtifacts, Platform, ScriptData, UploadUrls};

use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::workspace::JobWorkspace;

pub mod assembly;
pub mod media;
pub mod publish;
pub mod script;

pub use assembly::AssemblyGenerator;
pub use media::{AudioAdapter, ClipAdapter, MediaGenerator, SubtitleAdapter};
pub use publish::{publish_metadata, Publisher};
pub use script::{fallback_script, ScriptAdapter, ScriptGenerator};

/// Per-job state handed to every stage.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub workspace: JobWorkspace,
    pub logger: JobLogger,
}

impl JobContext {
    pub fn new(work_dir: impl AsRef<Path>, job_id: &JobId) -> Self {
        Self {
            job_id: job_id.clone(),
            workspace: JobWorkspace::new(work_dir, job_id),
            logger: JobLogger::new(job_id),
        }
    }
}

/// Prompt to script. Never fails unless the fallback cannot be produced.
#[async_trait]
pub trait ScriptStage: Send + Sync {
    async fn generate(&self, ctx: &JobContext, prompt: &str) -> WorkerResult<ScriptData>;
}

/// Script to audio, clips and subtitles, each degrading independently.
#[async_trait]
pub trait MediaStage: Send + Sync {
    async fn generate(&self, ctx: &JobContext, script: &ScriptData) -> WorkerResult<MediaArtifacts>;
}

/// Media artifacts to the final video. Failures are fatal.
#[async_trait]
pub trait AssemblyStage: Send + Sync {
    async fn assemble(&self, ctx: &JobContext, media: &MediaArtifacts) -> WorkerResult<PathBuf>;
}

/// Final video to platform URLs. Per-platform failures are absorbed.
#[async_trait]
pub trait PublishStage: Send + Sync {
    async fn publish(
        &self,
        ctx: &JobContext,
        video: &Path,
        metadata: &UploadMetadata,
        destinations: &[Platform],
    ) -> UploadUrls;
}
