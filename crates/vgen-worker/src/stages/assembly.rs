//! Assembly stage.

use std::path::PathBuf;

use async_trait::async_trait;
use vgen_media::MediaAssembler;
use vgen_models::MediaArtifacts;

use super::{AssemblyStage, JobContext};
use crate::error::WorkerResult;

/// Production assembly stage: concat, reconcile and mux in the job directory.
pub struct AssemblyGenerator {
    assembler: MediaAssembler,
}

impl AssemblyGenerator {
    pub fn new(assembler: MediaAssembler) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl AssemblyStage for AssemblyGenerator {
    async fn assemble(&self, ctx: &JobContext, media: &MediaArtifacts) -> WorkerResult<PathBuf> {
        let path = self
            .assembler
            .assemble(
                &media.clip_paths,
                &media.audio_path,
                &media.subtitle_path,
                &ctx.workspace.assembly(),
            )
            .await?;
        Ok(path)
    }
}
