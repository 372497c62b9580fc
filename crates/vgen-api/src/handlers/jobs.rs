//! Job submission and status handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;
use vgen_models::{GenerationRequest, JobId, JobStatusSnapshot};
use vgen_queue::QueueError;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status_url: String,
}

/// `POST /api/jobs`: schedule through the job service, which validates;
/// does not wait for the job.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let job_id = state.jobs.submit(request).await.map_err(|e| {
        if matches!(e, QueueError::InvalidRequest(_)) {
            metrics::record_job_rejected("invalid");
        }
        ApiError::from(e)
    })?;
    metrics::record_job_submitted();
    info!(job_id = %job_id, "Accepted generation request");

    let status_url = format!("/api/jobs/{}", job_id);
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse { job_id, status_url }),
    ))
}

/// `GET /api/jobs/:job_id`: latest snapshot.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusSnapshot>> {
    let job_id = job_id.trim();
    if job_id.is_empty() || job_id.len() > 128 {
        return Err(ApiError::bad_request("invalid job id"));
    }

    let job_id = JobId::from_string(job_id);
    state
        .jobs
        .status(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("job {}", job_id)))
}
