//! Retry policy applied at the queue boundary.
//!
//! A job attempt that fails fatally is retried with exponential backoff
//! until `max_attempts` executions have been started. Attempts are counted
//! in the status store, so executions before a crash and redelivery count
//! toward the same budget.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};
use vgen_models::JobId;
use vgen_queue::StatusStore;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Executions per job, including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
        };
        Self {
            max_attempts: std::env::var("JOB_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
            base_delay: millis("JOB_RETRY_BASE_DELAY_MS").unwrap_or(defaults.base_delay),
            max_delay: millis("JOB_RETRY_MAX_DELAY_MS").unwrap_or(defaults.max_delay),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay after the `retry`-th failure (0-based): `base * 2^retry`, capped.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(31));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Execute `operation` for `job_id` under the retry policy.
///
/// Each execution is counted via [`StatusStore::record_attempt`] and the
/// cause of each failure is stored. After the last allowed attempt the job
/// is marked failed in the store and `RetriesExhausted` is returned.
pub async fn run_with_retry<F, Fut, T>(
    config: &RetryConfig,
    store: &dyn StatusStore,
    job_id: &JobId,
    mut operation: F,
) -> WorkerResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = WorkerResult<T>>,
{
    loop {
        let attempt = store.record_attempt(job_id).await?;

        if attempt > config.max_attempts {
            // Budget already spent by executions before a redelivery
            let last_error = store
                .get(job_id)
                .await?
                .and_then(|s| s.error)
                .unwrap_or_else(|| "attempt budget exhausted".to_string());
            return exhaust(store, job_id, attempt - 1, last_error).await;
        }

        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let message = error.to_string();
        store.record_error(job_id, &message).await?;

        if attempt >= config.max_attempts || !error.is_retryable() {
            return exhaust(store, job_id, attempt, message).await;
        }

        let delay = config.delay_for_retry(attempt - 1);
        warn!(
            job_id = %job_id,
            attempt,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %message,
            "Job attempt failed, retrying"
        );
        metrics::record_retry();
        tokio::time::sleep(delay).await;
    }
}

async fn exhaust<T>(
    store: &dyn StatusStore,
    job_id: &JobId,
    attempts: u32,
    last_error: String,
) -> WorkerResult<T> {
    debug!(job_id = %job_id, attempts, "Retry budget exhausted");
    store.fail(job_id, &last_error).await?;
    metrics::record_job_failed();
    Err(WorkerError::RetriesExhausted {
        attempts,
        last_error,
    })
}
