//! Job orchestrator.
//!
//! Drives the four stages of one job in order and reports progress after
//! each one: accepted 10, script 25, media 50, assembled 75, published (or
//! skipped) 90, done 100.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{warn, Instrument};
use vgen_ai_client::{GeminiScriptClient, ImageClient, SpeechClient};
use vgen_media::{FfmpegRunner, MediaAssembler, PlaceholderStyle};
use vgen_models::{JobResult, JobStage, UploadUrls};
use vgen_queue::{GenerateVideoJob, StatusStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::retry::{run_with_retry, RetryConfig};
use crate::stages::{
    publish_metadata, AssemblyGenerator, AssemblyStage, AudioAdapter, ClipAdapter, JobContext,
    MediaGenerator, MediaStage, PublishStage, Publisher, ScriptAdapter, ScriptGenerator,
    ScriptStage,
};

/// The stage implementations a job runs through.
#[derive(Clone)]
pub struct Pipeline {
    pub script: Arc<dyn ScriptStage>,
    pub media: Arc<dyn MediaStage>,
    pub assembly: Arc<dyn AssemblyStage>,
    pub publish: Arc<dyn PublishStage>,
}

impl Pipeline {
    /// Production stages built from configuration.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        let runner = FfmpegRunner::new()
            .with_binary(config.render.ffmpeg_binary.clone())
            .with_ffprobe_binary(config.render.ffprobe_binary.clone())
            .with_timeout(config.ffmpeg_timeout.as_secs());
        let style = PlaceholderStyle {
            color: config.render.placeholder_color.clone(),
            font_file: config.render.font_file.clone(),
        };

        let script = ScriptGenerator::new(ScriptAdapter::new(GeminiScriptClient::new(
            config.script.clone(),
        )?));
        let media = MediaGenerator::new(
            AudioAdapter::new(
                SpeechClient::new(config.speech.clone())?,
                runner.clone(),
                config.render.fallback_audio_seconds,
            ),
            ClipAdapter::new(ImageClient::new(config.image.clone())?, runner.clone(), style),
            config.max_clip_parallel,
        );
        let assembly = AssemblyGenerator::new(MediaAssembler::new(runner));
        let publish = Publisher::from_config(&config.publish)?;

        Ok(Self {
            script: Arc::new(script),
            media: Arc::new(media),
            assembly: Arc::new(assembly),
            publish: Arc::new(publish),
        })
    }
}

/// Runs jobs through the [`Pipeline`], recording status as it goes.
pub struct JobOrchestrator {
    pipeline: Pipeline,
    store: Arc<dyn StatusStore>,
    work_dir: PathBuf,
}

impl JobOrchestrator {
    pub fn new(pipeline: Pipeline, store: Arc<dyn StatusStore>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            store,
            work_dir: work_dir.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Run one attempt of `job` through every stage and return its result.
    ///
    /// Any error is fatal for this attempt; degradable stage failures were
    /// already absorbed by the stages. The result is not persisted here.
    pub async fn run(&self, job: &GenerateVideoJob) -> WorkerResult<JobResult> {
        let ctx = JobContext::new(&self.work_dir, &job.job_id);
        let request = &job.request;

        self.report(&ctx, JobStage::Accepted).await;

        let script = self.pipeline.script.generate(&ctx, &request.prompt).await?;
        self.report(&ctx, JobStage::ScriptReady).await;

        let media = self.pipeline.media.generate(&ctx, &script).await?;
        self.report(&ctx, JobStage::MediaReady).await;

        let final_video = self.pipeline.assembly.assemble(&ctx, &media).await?;
        self.report(&ctx, JobStage::Assembled).await;

        let destinations = request.destinations();
        let upload_urls = if destinations.is_empty() {
            UploadUrls::new()
        } else {
            let metadata = publish_metadata(request, &script);
            self.pipeline
                .publish
                .publish(&ctx, &final_video, &metadata, &destinations)
                .await
        };
        self.report(&ctx, JobStage::Published).await;

        Ok(JobResult {
            success: true,
            job_id: job.job_id.clone(),
            final_video_path: final_video,
            upload_urls,
            script_data: script,
            media_files: media,
            completed_at: Utc::now(),
        })
    }

    /// Run `job` to a terminal state: each attempt bounded by `job_timeout`,
    /// failed attempts retried per `retry`.
    pub async fn execute(
        &self,
        job: &GenerateVideoJob,
        retry: &RetryConfig,
        job_timeout: Duration,
    ) -> WorkerResult<JobResult> {
        let started = Instant::now();
        let logger = crate::logging::JobLogger::new(&job.job_id);
        let span = logger.create_span();

        let result = run_with_retry(retry, self.store.as_ref(), &job.job_id, |attempt| {
            logger.log_start(attempt, &job.request.prompt);
            async move {
                match tokio::time::timeout(job_timeout, self.run(job)).await {
                    Ok(result) => result,
                    Err(_) => Err(WorkerError::Timeout(job_timeout.as_secs())),
                }
            }
        })
        .instrument(span.clone())
        .await;

        // A failed result write never reruns the stages
        let result = match result {
            Ok(result) => self
                .record_result(&result, retry)
                .instrument(span)
                .await
                .map(|()| result),
            Err(e) => Err(e),
        };

        match &result {
            Ok(result) => {
                logger.log_stage(JobStage::Done);
                logger.log_completion(
                    &result.final_video_path.display().to_string(),
                    result.upload_urls.len(),
                );
                metrics::record_job_completed(started.elapsed().as_secs_f64());
            }
            Err(e) => logger.log_error(&e.to_string()),
        }
        result
    }

    /// Persist a finished result, retrying the store write on its own.
    async fn record_result(&self, result: &JobResult, retry: &RetryConfig) -> WorkerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.complete(&result.job_id, result).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < retry.max_attempts => {
                    let delay = retry.delay_for_retry(attempt - 1);
                    warn!(
                        job_id = %result.job_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Failed to record job result, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Progress reporting is best effort; a store hiccup does not fail the job.
    async fn report(&self, ctx: &JobContext, stage: JobStage) {
        ctx.logger.log_stage(stage);
        if let Err(e) = self.store.update_stage(&ctx.job_id, stage).await {
            warn!(job_id = %ctx.job_id, stage = %stage, error = %e, "Failed to record progress");
        }
    }
}
