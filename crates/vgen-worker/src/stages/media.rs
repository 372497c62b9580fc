//! Media stage: narration audio, one clip per visual cue, subtitles.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use vgen_ai_client::{ExternalServiceError, ImageClient, ServiceResult, SpeechClient};
use vgen_media::{
    render_placeholder, render_silent_audio, render_still_clip, rescale_cues,
    write_srt, FfmpegRunner, MediaError, PlaceholderKind, PlaceholderStyle,
};
use vgen_models::{MediaArtifacts, ScriptData, SubtitleCue, VisualCue};

use super::{JobContext, MediaStage};
use crate::adapter::{produce, StageAdapter};
use crate::error::{WorkerError, WorkerResult};

/// Narration to speak and where to put it.
#[derive(Debug, Clone)]
pub struct AudioRequest {
    pub narration: String,
    pub output: PathBuf,
}

/// Speech synthesis, falling back to a silent track.
pub struct AudioAdapter {
    client: SpeechClient,
    runner: FfmpegRunner,
    fallback_seconds: f64,
}

impl AudioAdapter {
    pub fn new(client: SpeechClient, runner: FfmpegRunner, fallback_seconds: f64) -> Self {
        Self {
            client,
            runner,
            fallback_seconds,
        }
    }
}

#[async_trait]
impl StageAdapter for AudioAdapter {
    type Input = AudioRequest;
    type Output = PathBuf;

    fn stage(&self) -> &'static str {
        "audio"
    }

    fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    async fn attempt(&self, request: &AudioRequest) -> ServiceResult<PathBuf> {
        self.client
            .synthesize(&request.narration, &request.output)
            .await?;
        Ok(request.output.clone())
    }

    async fn fallback(&self, request: &AudioRequest) -> WorkerResult<PathBuf> {
        render_silent_audio(&self.runner, &request.output, self.fallback_seconds)
            .await
            .map_err(|e| WorkerError::fallback_failed("audio", e.to_string()))?;
        Ok(request.output.clone())
    }
}

/// One visual cue to render.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub cue: VisualCue,
    /// Where the generated still is downloaded
    pub image: PathBuf,
    pub output: PathBuf,
}

/// Image generation rendered into a clip, falling back to a placeholder.
pub struct ClipAdapter {
    client: ImageClient,
    runner: FfmpegRunner,
    style: PlaceholderStyle,
}

impl ClipAdapter {
    pub fn new(client: ImageClient, runner: FfmpegRunner, style: PlaceholderStyle) -> Self {
        Self {
            client,
            runner,
            style,
        }
    }
}

#[async_trait]
impl StageAdapter for ClipAdapter {
    type Input = ClipRequest;
    type Output = PathBuf;

    fn stage(&self) -> &'static str {
        "clip"
    }

    fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    async fn attempt(&self, request: &ClipRequest) -> ServiceResult<PathBuf> {
        self.client
            .generate_image(&request.cue.descriptor, &request.image)
            .await?;
        render_still_clip(
            &self.runner,
            &request.image,
            &request.output,
            request.cue.duration_seconds,
        )
        .await
        .map_err(|e| ExternalServiceError::invalid_response(format!("unusable image: {}", e)))?;
        Ok(request.output.clone())
    }

    async fn fallback(&self, request: &ClipRequest) -> WorkerResult<PathBuf> {
        let kind = render_placeholder(
            &self.runner,
            &request.output,
            request.cue.duration_seconds,
            &request.cue.descriptor,
            &self.style,
        )
        .await
        .map_err(|e| WorkerError::fallback_failed("clip", e.to_string()))?;

        if kind == PlaceholderKind::Plain {
            debug!(index = request.cue.index, "Placeholder rendered without caption");
        }
        Ok(request.output.clone())
    }
}

/// Subtitle cues to write, aligned to the narration in `audio`.
#[derive(Debug, Clone)]
pub struct SubtitleRequest {
    pub cues: Vec<SubtitleCue>,
    pub audio: PathBuf,
    pub output: PathBuf,
}

/// SRT writer. Fits the cue timeline to the narration length when it can
/// be probed and writes the cues as given otherwise.
#[derive(Debug, Clone)]
pub struct SubtitleAdapter {
    runner: FfmpegRunner,
}

impl SubtitleAdapter {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl StageAdapter for SubtitleAdapter {
    type Input = SubtitleRequest;
    type Output = PathBuf;

    fn stage(&self) -> &'static str {
        "subtitles"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn attempt(&self, request: &SubtitleRequest) -> ServiceResult<PathBuf> {
        let narration_seconds = self
            .runner
            .probe_duration(&request.audio)
            .await
            .map_err(|e| match e {
                MediaError::Timeout(_) => ExternalServiceError::timeout(e.to_string()),
                other => ExternalServiceError::invalid_response(other.to_string()),
            })?;
        let cues = rescale_cues(&request.cues, narration_seconds);
        write_srt(&request.output, &cues)
            .await
            .map_err(|e| ExternalServiceError::request_failed(e.to_string()))?;
        Ok(request.output.clone())
    }

    async fn fallback(&self, request: &SubtitleRequest) -> WorkerResult<PathBuf> {
        write_srt(&request.output, &request.cues)
            .await
            .map_err(|e| WorkerError::fallback_failed("subtitles", e.to_string()))?;
        Ok(request.output.clone())
    }
}

/// Production media stage.
pub struct MediaGenerator {
    audio: AudioAdapter,
    clips: ClipAdapter,
    subtitles: SubtitleAdapter,
    max_clip_parallel: usize,
}

impl MediaGenerator {
    pub fn new(audio: AudioAdapter, clips: ClipAdapter, max_clip_parallel: usize) -> Self {
        Self {
            subtitles: SubtitleAdapter::new(audio.runner.clone()),
            audio,
            clips,
            max_clip_parallel: max_clip_parallel.max(1),
        }
    }

    /// Render every cue, at most `max_clip_parallel` at a time.
    /// The result has one path per cue, in cue order.
    async fn render_clips(&self, ctx: &JobContext, cues: &[VisualCue]) -> WorkerResult<Vec<PathBuf>> {
        let semaphore = Semaphore::new(self.max_clip_parallel);

        let futures = cues.iter().map(|cue| {
            let request = ClipRequest {
                cue: cue.clone(),
                image: ctx.workspace.image(cue.index),
                output: ctx.workspace.clip(cue.index),
            };
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;
                produce(&self.clips, &request).await
            }
        });

        join_all(futures).await.into_iter().collect()
    }
}

#[async_trait]
impl MediaStage for MediaGenerator {
    async fn generate(&self, ctx: &JobContext, script: &ScriptData) -> WorkerResult<MediaArtifacts> {
        ctx.workspace.prepare().await?;

        let audio_request = AudioRequest {
            narration: script.narration.clone(),
            output: ctx.workspace.audio(),
        };
        let (audio_path, clip_paths) = tokio::join!(
            produce(&self.audio, &audio_request),
            self.render_clips(ctx, &script.visual_cues),
        );
        let audio_path = audio_path?;
        let clip_paths = clip_paths?;

        let subtitle_request = SubtitleRequest {
            cues: script.subtitle_cues.clone(),
            audio: audio_path.clone(),
            output: ctx.workspace.subtitles(),
        };
        let subtitle_path = produce(&self.subtitles, &subtitle_request).await?;

        info!(job_id = %ctx.job_id, clips = clip_paths.len(), "Media ready");
        Ok(MediaArtifacts {
            audio_path,
            clip_paths,
            subtitle_path,
        })
    }
}
