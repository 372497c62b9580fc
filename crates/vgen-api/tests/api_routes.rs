//! Route tests against an in-memory job service.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vgen_api::{create_router, ApiConfig, AppState};
use vgen_models::{GenerationRequest, JobId, JobStage, JobStatusSnapshot};
use vgen_queue::{
    validate_request, JobService, MemoryStatusStore, QueueError, QueueResult, StatusStore,
};

/// Records submissions without running them.
#[derive(Default)]
struct RecordingJobs {
    store: MemoryStatusStore,
    offline: bool,
    submits: AtomicU32,
}

#[async_trait]
impl JobService for RecordingJobs {
    async fn submit(&self, request: GenerationRequest) -> QueueResult<JobId> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(QueueError::connection_failed("redis down"));
        }
        validate_request(&request)?;
        let job_id = JobId::new();
        self.store.create(&job_id).await?;
        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        self.store.get(job_id).await
    }
}

fn app_with(jobs: Arc<RecordingJobs>, config: ApiConfig) -> Router {
    create_router(AppState::new(config, jobs), None)
}

fn app(jobs: Arc<RecordingJobs>) -> Router {
    app_with(jobs, ApiConfig::default())
}

fn post_job(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_returns_accepted_with_job_id() {
    let jobs = Arc::new(RecordingJobs::default());
    let response = app(Arc::clone(&jobs))
        .oneshot(post_job(json!({
            "prompt": "space exploration",
            "uploadFlags": {"toYoutube": true, "toTiktok": false}
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    let job_id = body["jobId"].as_str().unwrap().to_string();
    assert_eq!(body["statusUrl"], format!("/api/jobs/{}", job_id));

    let snapshot = jobs.store.get(&JobId::from_string(job_id)).await.unwrap().unwrap();
    assert_eq!(snapshot.state, JobStage::Queued);
}

#[tokio::test]
async fn blank_prompt_is_rejected() {
    let jobs = Arc::new(RecordingJobs::default());
    let response = app(Arc::clone(&jobs))
        .oneshot(post_job(json!({"prompt": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_request");
    // Validation is left to the job service
    assert_eq!(jobs.submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn queue_outage_is_unavailable() {
    let jobs = Arc::new(RecordingJobs {
        offline: true,
        ..RecordingJobs::default()
    });
    let response = app(jobs)
        .oneshot(post_job(json!({"prompt": "ocean life"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_reflects_progress() {
    let jobs = Arc::new(RecordingJobs::default());
    let job_id = JobId::from_string("job-42");
    jobs.store.create(&job_id).await.unwrap();
    jobs.store.update_stage(&job_id, JobStage::Accepted).await.unwrap();
    jobs.store.update_stage(&job_id, JobStage::ScriptReady).await.unwrap();

    let response = app(jobs)
        .oneshot(
            Request::builder()
                .uri("/api/jobs/job-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["jobId"], "job-42");
    assert_eq!(body["state"], "script_ready");
    assert_eq!(body["progress"], 25);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let response = app(Arc::new(RecordingJobs::default()))
        .oneshot(
            Request::builder()
                .uri("/api/jobs/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");
}

#[tokio::test]
async fn health_and_ready_without_queue() {
    let app = app(Arc::new(RecordingJobs::default()));

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.headers()["x-content-type-options"], "nosniff");

    let ready = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    let body = json_body(ready).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["redis"]["status"], "skipped");
}

#[tokio::test]
async fn metrics_route_absent_when_disabled() {
    let response = app(Arc::new(RecordingJobs::default()))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        rate_limit_burst: 1,
        ..ApiConfig::default()
    };
    let app = app_with(Arc::new(RecordingJobs::default()), config);

    let request = |ip: &str| {
        Request::builder()
            .uri("/api/jobs/missing")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request("198.51.100.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app.clone().oneshot(request("198.51.100.1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()[header::RETRY_AFTER], "1");

    let other = app.oneshot(request("198.51.100.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = ApiConfig {
        max_body_size: 64,
        ..ApiConfig::default()
    };
    let response = app_with(Arc::new(RecordingJobs::default()), config)
        .oneshot(post_job(json!({"prompt": "x".repeat(500)})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
