//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vgen_ai_client::{GeminiConfig, ImageConfig, PublishConfig, SpeechConfig};
use vgen_media::placeholder::DEFAULT_PLACEHOLDER_COLOR;

use crate::retry::RetryConfig;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env_parse(key).map(Duration::from_secs).unwrap_or(default)
}

/// Fallback rendering parameters.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Background of placeholder clips
    pub placeholder_color: String,
    /// Font used to caption placeholders
    pub font_file: Option<PathBuf>,
    /// Length of the silent track used when narration cannot be synthesized
    pub fallback_audio_seconds: f64,
    /// FFmpeg binary name or path
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            placeholder_color: DEFAULT_PLACEHOLDER_COLOR.to_string(),
            font_file: None,
            fallback_audio_seconds: 30.0,
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            placeholder_color: std::env::var("PLACEHOLDER_COLOR")
                .unwrap_or(defaults.placeholder_color),
            font_file: std::env::var("PLACEHOLDER_FONT_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            fallback_audio_seconds: env_parse("FALLBACK_AUDIO_SECS")
                .filter(|s: &f64| s.is_finite() && *s > 0.0)
                .unwrap_or(defaults.fallback_audio_seconds),
            ffmpeg_binary: std::env::var("FFMPEG_BINARY").unwrap_or(defaults.ffmpeg_binary),
            ffprobe_binary: std::env::var("FFPROBE_BINARY").unwrap_or(defaults.ffprobe_binary),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root under which each job gets its own directory
    pub work_dir: PathBuf,
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Maximum clips rendered in parallel within a single job
    pub max_clip_parallel: usize,
    /// Upper bound for one execution attempt of a job
    pub job_timeout: Duration,
    /// Upper bound for a single FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// How often the worker scans for orphaned pending jobs
    pub claim_interval: Duration,
    pub retry: RetryConfig,
    pub script: GeminiConfig,
    pub image: ImageConfig,
    pub speech: SpeechConfig,
    pub publish: PublishConfig,
    pub render: RenderConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/vgen"),
            max_concurrent_jobs: 2,
            max_clip_parallel: 4,
            job_timeout: Duration::from_secs(1800),
            ffmpeg_timeout: Duration::from_secs(600),
            shutdown_timeout: Duration::from_secs(60),
            claim_interval: Duration::from_secs(30),
            retry: RetryConfig::default(),
            script: GeminiConfig::default(),
            image: ImageConfig::default(),
            speech: SpeechConfig::default(),
            publish: PublishConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            max_clip_parallel: env_parse("WORKER_MAX_CLIP_PARALLEL")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_clip_parallel),
            job_timeout: env_secs("WORKER_JOB_TIMEOUT", defaults.job_timeout),
            ffmpeg_timeout: env_secs("WORKER_FFMPEG_TIMEOUT", defaults.ffmpeg_timeout),
            shutdown_timeout: env_secs("WORKER_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout),
            claim_interval: env_secs("WORKER_CLAIM_INTERVAL_SECS", defaults.claim_interval),
            retry: RetryConfig::from_env(),
            script: GeminiConfig::from_env(),
            image: ImageConfig::from_env(),
            speech: SpeechConfig::from_env(),
            publish: PublishConfig::from_env(),
            render: RenderConfig::from_env(),
        }
    }
}
