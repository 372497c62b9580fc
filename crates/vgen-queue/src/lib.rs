//! Redis Streams job queue and job status tracking.
//!
//! This crate provides:
//! - Job enqueueing via Redis Streams with idempotency keys
//! - Worker consumption, pending-entry reclaim and a dead-letter stream
//! - Job status snapshots in Redis or in memory
//! - The submit/observe service used by the API

pub mod error;
pub mod job;
pub mod queue;
pub mod service;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use job::GenerateVideoJob;
pub use queue::{JobQueue, QueueConfig};
pub use service::{validate_request, JobService, QueueJobService};
pub use status::{MemoryStatusStore, RedisStatusStore, StatusStore, JOB_STATUS_TTL_SECS};
