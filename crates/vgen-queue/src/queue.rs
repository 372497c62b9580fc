//! Job queue using Redis Streams.

use std::time::Duration;

use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::GenerateVideoJob;

/// How long a dedup key blocks re-enqueueing the same job.
const DEDUP_TTL_SECS: u64 = 3600;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    pub consumer_group: String,
    /// Dead letter stream name
    pub dlq_stream_name: String,
    /// Attempts per job before it is failed and dead-lettered
    pub max_retries: u32,
    /// Idle time after which another worker may reclaim a delivery
    pub visibility_timeout: Duration,
    /// How often a worker refreshes the idle time of deliveries it holds
    pub heartbeat_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vgen:jobs".to_string(),
            consumer_group: "vgen:workers".to_string(),
            dlq_stream_name: "vgen:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(900),
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_retries),
            visibility_timeout: std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.visibility_timeout),
            heartbeat_interval: std::env::var("QUEUE_HEARTBEAT_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
        }
    }

    /// A held delivery must be refreshed at least twice per visibility
    /// timeout, otherwise a live job can be claimed by another worker.
    pub fn validate(&self) -> QueueResult<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(QueueError::invalid_config("heartbeat interval must be positive"));
        }
        if self.visibility_timeout <= self.heartbeat_interval * 2 {
            return Err(QueueError::invalid_config(format!(
                "visibility timeout ({}s) must exceed twice the heartbeat interval ({}s)",
                self.visibility_timeout.as_secs(),
                self.heartbeat_interval.as_secs()
            )));
        }
        Ok(())
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        config.validate()?;
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// The underlying client, shared with the Redis status store.
    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    async fn connection(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }

    /// Create the consumer group if it does not exist yet.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Check connectivity.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Enqueue a job, rejecting duplicates of the same job id.
    pub async fn enqueue(&self, job: &GenerateVideoJob) -> QueueResult<String> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job)?;
        let idempotency_key = job.idempotency_key();

        let dedup_key = format!("vgen:dedup:{}", idempotency_key);
        let fresh: bool = redis::cmd("SET")
            .arg(&dedup_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(DEDUP_TTL_SECS)
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();
        if !fresh {
            warn!("Duplicate job rejected: {}", idempotency_key);
            return Err(QueueError::enqueue_failed("Duplicate job"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        info!(job_id = %job.job_id, message_id = %message_id, "Enqueued job");
        Ok(message_id)
    }

    /// Acknowledge and delete a delivery.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    /// Move a job to the dead letter stream and acknowledge the original.
    pub async fn dlq(&self, message_id: &str, job: &GenerateVideoJob, error: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!(job_id = %job.job_id, "Moved job to DLQ: {}", error);
        Ok(())
    }

    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Read new deliveries for this consumer, blocking up to `block_ms`.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, GenerateVideoJob)>> {
        let mut conn = self.connection().await?;

        let result: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let entries = result
            .map(|reply| reply.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();
        Ok(self.decode_entries(entries).await)
    }

    /// Claim deliveries that another consumer left idle past the visibility
    /// timeout, which is how jobs from crashed workers are picked up again.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<(String, GenerateVideoJob)>> {
        let mut conn = self.connection().await?;
        let min_idle_ms = self.config.visibility_timeout.as_millis() as u64;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for entry in &pending.ids {
            cmd.arg(&entry.id);
        }
        let claimed: StreamClaimReply = cmd.query_async(&mut conn).await?;

        let jobs = self.decode_entries(claimed.ids).await;
        for (message_id, job) in &jobs {
            info!(job_id = %job.job_id, message_id = %message_id, "Claimed pending job");
        }
        Ok(jobs)
    }

    /// Reset the idle time of a delivery this consumer still owns.
    ///
    /// Returns `false` when the delivery is gone or was claimed by another
    /// consumer; it is never taken back.
    pub async fn touch(&self, consumer_name: &str, message_id: &str) -> QueueResult<bool> {
        let mut conn = self.connection().await?;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .arg(message_id)
            .arg(1)
            .query_async(&mut conn)
            .await?;
        let owned = pending
            .ids
            .iter()
            .any(|entry| entry.id == message_id && entry.consumer == consumer_name);
        if !owned {
            return Ok(false);
        }

        let claimed: Vec<String> = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        debug!(message_id = %message_id, "Refreshed delivery");
        Ok(!claimed.is_empty())
    }

    /// Decode stream entries; malformed payloads are acknowledged and dropped.
    async fn decode_entries(&self, entries: Vec<StreamId>) -> Vec<(String, GenerateVideoJob)> {
        let mut jobs = Vec::with_capacity(entries.len());
        for entry in entries {
            match decode_entry(&entry) {
                Ok(job) => {
                    debug!(job_id = %job.job_id, "Consumed job from stream");
                    jobs.push((entry.id, job));
                }
                Err(e) => {
                    warn!("Failed to parse job payload {}: {}", entry.id, e);
                    self.ack(&entry.id).await.ok();
                }
            }
        }
        jobs
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

fn decode_entry(entry: &StreamId) -> QueueResult<GenerateVideoJob> {
    let payload: String = entry
        .get("job")
        .ok_or_else(|| QueueError::JobNotFound(format!("entry {} has no job field", entry.id)))?;
    Ok(serde_json::from_str(&payload)?)
}
