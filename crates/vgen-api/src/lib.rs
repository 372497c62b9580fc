//! HTTP surface of the video generation pipeline.
//!
//! Accepts generation requests, hands them to a [`vgen_queue::JobService`]
//! and serves status snapshots, health and Prometheus metrics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
