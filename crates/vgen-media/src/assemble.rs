//! Media assembly: concat, reconcile, mux.

use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::command::FfmpegRunner;
use crate::concat::concat_clips;
use crate::error::MediaResult;
use crate::fs_utils::{move_file, remove_if_exists};
use crate::mux::mux_with_subtitles;
use crate::reconcile::reconcile_duration;

/// Intermediate and final file locations inside a job directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPaths {
    job_dir: PathBuf,
}

impl AssemblyPaths {
    pub fn new(job_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_dir: job_dir.into(),
        }
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn concat_list(&self) -> PathBuf {
        self.job_dir.join("concat.txt")
    }

    pub fn concatenated(&self) -> PathBuf {
        self.job_dir.join("concat.mp4")
    }

    pub fn reconciled(&self) -> PathBuf {
        self.job_dir.join("reconciled.mp4")
    }

    /// Mux target; renamed to [`AssemblyPaths::final_video`] once complete.
    pub fn partial_final(&self) -> PathBuf {
        self.job_dir.join("final.partial.mp4")
    }

    pub fn final_video(&self) -> PathBuf {
        self.job_dir.join("final.mp4")
    }
}

/// Turns clips, narration and subtitles into the final video.
#[derive(Debug, Clone, Default)]
pub struct MediaAssembler {
    runner: FfmpegRunner,
}

impl MediaAssembler {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &FfmpegRunner {
        &self.runner
    }

    /// Assemble the final video and return its path.
    ///
    /// Concatenation and mux failures are returned; reconciliation problems
    /// are logged and the unadjusted video is muxed instead (`-shortest`
    /// still bounds the output by the narration).
    #[instrument(skip_all, fields(job_dir = %paths.job_dir().display(), clips = clips.len()))]
    pub async fn assemble(
        &self,
        clips: &[PathBuf],
        audio: &Path,
        subtitles: &Path,
        paths: &AssemblyPaths,
    ) -> MediaResult<PathBuf> {
        let concatenated = paths.concatenated();
        concat_clips(&self.runner, clips, paths.concat_list(), &concatenated).await?;

        let video = reconcile_duration(&self.runner, &concatenated, audio, paths.reconciled()).await?;

        let partial = paths.partial_final();
        remove_if_exists(&partial).await?;
        let expected_seconds = self.runner.probe_duration(audio).await.ok();
        mux_with_subtitles(
            &self.runner,
            &video,
            audio,
            subtitles,
            &partial,
            expected_seconds,
        )
        .await?;

        let final_video = paths.final_video();
        move_file(&partial, &final_video).await?;

        info!(path = %final_video.display(), "Assembled final video");
        Ok(final_video)
    }
}
