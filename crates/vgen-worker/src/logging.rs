//! Structured job logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vgen_models::{JobId, JobStage};

/// Install the global subscriber: JSON lines when `LOG_FORMAT=json`,
/// ANSI text otherwise. `RUST_LOG` directives apply on top of `vgen=info`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "vgen=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

/// Logs job lifecycle events with the job id attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }

    pub fn log_start(&self, attempt: u32, prompt: &str) {
        info!(job_id = %self.job_id, attempt, prompt, "Job started");
    }

    /// A pipeline stage completed.
    pub fn log_stage(&self, stage: JobStage) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            progress = stage.progress().unwrap_or_default(),
            "Stage complete"
        );
    }

    /// A stage degraded to its fallback output.
    pub fn log_fallback(&self, stage: &str, reason: &str) {
        warn!(job_id = %self.job_id, stage, reason, "Using fallback output");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, "Job error: {}", message);
    }

    pub fn log_completion(&self, final_video: &str, uploads: usize) {
        info!(job_id = %self.job_id, final_video, uploads, "Job completed");
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping one execution attempt.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id)
    }
}
