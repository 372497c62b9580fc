//! Worker metrics.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub mod names {
    pub const STAGE_FALLBACK_TOTAL: &str = "vgen_stage_fallback_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vgen_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vgen_jobs_failed_total";
    pub const JOB_RETRIES_TOTAL: &str = "vgen_job_retries_total";
    pub const JOB_DURATION_SECONDS: &str = "vgen_job_duration_seconds";
    pub const UPLOADS_TOTAL: &str = "vgen_uploads_total";
}

/// Serve worker metrics for Prometheus scraping on `addr`.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

/// A stage adapter fell back; `reason` is the error kind or `unconfigured`.
pub fn record_fallback(stage: &str, reason: &str) {
    counter!(
        names::STAGE_FALLBACK_TOTAL,
        "stage" => stage.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}

pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

pub fn record_retry() {
    counter!(names::JOB_RETRIES_TOTAL).increment(1);
}

pub fn record_upload(platform: &str, success: bool) {
    counter!(
        names::UPLOADS_TOTAL,
        "platform" => platform.to_string(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}
