//! Job status storage.
//!
//! Every status change goes through [`JobStatusSnapshot`], so progress stays
//! non-decreasing no matter which store backs it or how often a job retries.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::debug;
use vgen_models::{JobId, JobResult, JobStage, JobStatusSnapshot};

use crate::error::{QueueError, QueueResult};

/// How long a status snapshot stays readable after its last update.
pub const JOB_STATUS_TTL_SECS: u64 = 7 * 24 * 3600;

/// Persistence for job status snapshots.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Record a freshly submitted job.
    async fn create(&self, job_id: &JobId) -> QueueResult<JobStatusSnapshot>;

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>>;

    /// Count a new execution; returns the attempt number (1-based).
    async fn record_attempt(&self, job_id: &JobId) -> QueueResult<u32>;

    /// Report that the job reached `stage`.
    async fn update_stage(&self, job_id: &JobId, stage: JobStage) -> QueueResult<()>;

    /// Keep the cause of a failed attempt that will be retried.
    async fn record_error(&self, job_id: &JobId, error: &str) -> QueueResult<()>;

    async fn complete(&self, job_id: &JobId, result: &JobResult) -> QueueResult<()>;

    /// Mark the job terminally failed.
    async fn fail(&self, job_id: &JobId, error: &str) -> QueueResult<()>;
}

/// Redis-backed store holding one JSON blob per job.
pub struct RedisStatusStore {
    client: redis::Client,
    ttl: Duration,
}

impl RedisStatusStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            ttl: Duration::from_secs(JOB_STATUS_TTL_SECS),
        }
    }

    pub fn from_url(redis_url: &str) -> QueueResult<Self> {
        Ok(Self::new(redis::Client::open(redis_url)?))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn key(job_id: &JobId) -> String {
        format!("vgen:status:{}", job_id)
    }

    async fn connection(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }

    async fn save(&self, snapshot: &JobStatusSnapshot) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(snapshot)?;
        conn.set_ex::<_, _, ()>(Self::key(&snapshot.job_id), payload, self.ttl.as_secs())
            .await?;
        Ok(())
    }

    /// Read-modify-write. A job is executed by one worker at a time, so
    /// writes for the same key do not race.
    async fn modify<F>(&self, job_id: &JobId, f: F) -> QueueResult<JobStatusSnapshot>
    where
        F: FnOnce(&mut JobStatusSnapshot) + Send,
    {
        let mut snapshot = self
            .get(job_id)
            .await?
            .unwrap_or_else(|| JobStatusSnapshot::queued(job_id.clone()));
        f(&mut snapshot);
        self.save(&snapshot).await?;
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn create(&self, job_id: &JobId) -> QueueResult<JobStatusSnapshot> {
        let snapshot = JobStatusSnapshot::queued(job_id.clone());
        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(Self::key(job_id)).await?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(QueueError::from))
            .transpose()
    }

    async fn record_attempt(&self, job_id: &JobId) -> QueueResult<u32> {
        let snapshot = self.modify(job_id, |s| s.attempts += 1).await?;
        Ok(snapshot.attempts)
    }

    async fn update_stage(&self, job_id: &JobId, stage: JobStage) -> QueueResult<()> {
        let snapshot = self.modify(job_id, |s| s.advance(stage)).await?;
        debug!(job_id = %job_id, stage = %stage, progress = snapshot.progress, "Status updated");
        Ok(())
    }

    async fn record_error(&self, job_id: &JobId, error: &str) -> QueueResult<()> {
        self.modify(job_id, |s| s.error = Some(error.to_string())).await?;
        Ok(())
    }

    async fn complete(&self, job_id: &JobId, result: &JobResult) -> QueueResult<()> {
        self.modify(job_id, |s| s.complete(result.clone())).await?;
        Ok(())
    }

    async fn fail(&self, job_id: &JobId, error: &str) -> QueueResult<()> {
        self.modify(job_id, |s| s.fail(error)).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    snapshot: JobStatusSnapshot,
    history: Vec<u8>,
}

/// In-process store for local runs and tests.
///
/// Besides the latest snapshot it keeps every progress value reported via
/// `update_stage` and `complete`, in order.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    entries: RwLock<HashMap<JobId, MemoryEntry>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress values reported for a job so far.
    pub async fn progress_history(&self, job_id: &JobId) -> Vec<u8> {
        self.entries
            .read()
            .await
            .get(job_id)
            .map(|e| e.history.clone())
            .unwrap_or_default()
    }

    async fn modify<F>(&self, job_id: &JobId, record: bool, f: F) -> JobStatusSnapshot
    where
        F: FnOnce(&mut JobStatusSnapshot),
    {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(job_id.clone()).or_insert_with(|| MemoryEntry {
            snapshot: JobStatusSnapshot::queued(job_id.clone()),
            history: Vec::new(),
        });
        f(&mut entry.snapshot);
        if record {
            entry.history.push(entry.snapshot.progress);
        }
        entry.snapshot.clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create(&self, job_id: &JobId) -> QueueResult<JobStatusSnapshot> {
        let snapshot = JobStatusSnapshot::queued(job_id.clone());
        self.entries.write().await.insert(
            job_id.clone(),
            MemoryEntry {
                snapshot: snapshot.clone(),
                history: Vec::new(),
            },
        );
        Ok(snapshot)
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        Ok(self.entries.read().await.get(job_id).map(|e| e.snapshot.clone()))
    }

    async fn record_attempt(&self, job_id: &JobId) -> QueueResult<u32> {
        Ok(self.modify(job_id, false, |s| s.attempts += 1).await.attempts)
    }

    async fn update_stage(&self, job_id: &JobId, stage: JobStage) -> QueueResult<()> {
        self.modify(job_id, true, |s| s.advance(stage)).await;
        Ok(())
    }

    async fn record_error(&self, job_id: &JobId, error: &str) -> QueueResult<()> {
        self.modify(job_id, false, |s| s.error = Some(error.to_string())).await;
        Ok(())
    }

    async fn complete(&self, job_id: &JobId, result: &JobResult) -> QueueResult<()> {
        self.modify(job_id, true, |s| s.complete(result.clone())).await;
        Ok(())
    }

    async fn fail(&self, job_id: &JobId, error: &str) -> QueueResult<()> {
        self.modify(job_id, false, |s| s.fail(error)).await;
        Ok(())
    }
}
