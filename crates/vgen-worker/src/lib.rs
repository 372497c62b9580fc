//! Prompt-to-video generation worker.
//!
//! This crate provides:
//! - Stage adapters with per-stage fallback outputs
//! - The job orchestrator and its progress contract
//! - Retry with exponential backoff at the queue boundary
//! - The Redis Streams executor and an in-process job service

pub mod adapter;
pub mod config;
pub mod error;
pub mod executor;
pub mod local;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod stages;
pub mod workspace;

pub use adapter::{produce, StageAdapter};
pub use config::{RenderConfig, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use local::LocalJobService;
pub use logging::{init_tracing, JobLogger};
pub use orchestrator::{JobOrchestrator, Pipeline};
pub use retry::RetryConfig;
pub use workspace::JobWorkspace;
