//! The attempt-then-fallback contract shared by all degradable stages.

use async_trait::async_trait;
use tracing::{debug, warn};
use vgen_ai_client::ServiceResult;

use crate::error::WorkerResult;
use crate::metrics;

/// One external capability wrapped with a deterministic fallback.
///
/// Both outputs must satisfy the same structural invariants, so callers
/// cannot tell them apart.
#[async_trait]
pub trait StageAdapter: Send + Sync {
    type Input: Sync + ?Sized;
    type Output: Send;

    /// Stage label used in logs and metrics.
    fn stage(&self) -> &'static str;

    /// Whether the capability has what it needs (credentials, endpoint) to be called.
    fn is_configured(&self) -> bool;

    async fn attempt(&self, input: &Self::Input) -> ServiceResult<Self::Output>;

    async fn fallback(&self, input: &Self::Input) -> WorkerResult<Self::Output>;
}

/// Run `adapter` on `input`, degrading to its fallback.
///
/// An unconfigured adapter goes straight to the fallback. A failed attempt
/// is logged and replaced by the fallback. Only an error from the fallback
/// itself is returned.
pub async fn produce<A>(adapter: &A, input: &A::Input) -> WorkerResult<A::Output>
where
    A: StageAdapter + ?Sized,
{
    let stage = adapter.stage();

    if !adapter.is_configured() {
        debug!(stage, "Capability not configured, using fallback");
        metrics::record_fallback(stage, "unconfigured");
        return adapter.fallback(input).await;
    }

    match adapter.attempt(input).await {
        Ok(output) => Ok(output),
        Err(e) => {
            warn!(stage, kind = %e.kind, error = %e, "Capability failed, using fallback");
            metrics::record_fallback(stage, e.kind.as_str());
            adapter.fallback(input).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vgen_ai_client::ExternalServiceError;

    struct Doubler {
        configured: bool,
        fail_attempt: bool,
        fail_fallback: bool,
        attempts: AtomicU32,
    }

    impl Doubler {
        fn new(configured: bool, fail_attempt: bool, fail_fallback: bool) -> Self {
            Self {
                configured,
                fail_attempt,
                fail_fallback,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl StageAdapter for Doubler {
        type Input = u32;
        type Output = u32;

        fn stage(&self) -> &'static str {
            "double"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn attempt(&self, input: &u32) -> ServiceResult<u32> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_attempt {
                return Err(ExternalServiceError::timeout("slow"));
            }
            Ok(input * 2)
        }

        async fn fallback(&self, _input: &u32) -> WorkerResult<u32> {
            if self.fail_fallback {
                return Err(WorkerError::fallback_failed("double", "broken"));
            }
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_unconfigured_skips_attempt() {
        let adapter = Doubler::new(false, false, false);
        assert_eq!(produce(&adapter, &4).await.unwrap(), 0);
        assert_eq!(adapter.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_uses_attempt_output() {
        let adapter = Doubler::new(true, false, false);
        assert_eq!(produce(&adapter, &4).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_failed_attempt_falls_back() {
        let adapter = Doubler::new(true, true, false);
        assert_eq!(produce(&adapter, &4).await.unwrap(), 0);
        assert_eq!(adapter.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_fatal() {
        let adapter = Doubler::new(true, true, true);
        let err = produce(&adapter, &4).await.unwrap_err();
        assert!(matches!(err, WorkerError::FallbackFailed { stage: "double", .. }));
    }
}
