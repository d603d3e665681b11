//! Status bookkeeping for cache calls.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use vfsdb_cache::{CacheResult, SyncStatus};

/// The last observed [`SyncStatus`], shared between restore and backup.
#[derive(Debug)]
pub(crate) struct LastStatus(AtomicI32);

impl LastStatus {
    pub(crate) fn new() -> Self {
        Self(AtomicI32::new(SyncStatus::UNSET.code()))
    }

    pub(crate) fn get(&self) -> SyncStatus {
        SyncStatus::from_code(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: SyncStatus) {
        self.0.store(status.code(), Ordering::Release);
    }
}

/// Runs one cache call and folds every outcome into a status.
///
/// Errors and panics become [`SyncStatus::FAILED`]; exceeding `timeout`
/// becomes [`SyncStatus::TIMED_OUT`]. The timeout needs a Tokio runtime and is
/// skipped without one.
pub(crate) async fn settle<F>(
    operation: &'static str,
    name: &str,
    timeout: Option<Duration>,
    call: F,
) -> SyncStatus
where
    F: Future<Output = CacheResult<SyncStatus>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();
    let limit = timeout.filter(|_| tokio::runtime::Handle::try_current().is_ok());
    let outcome = match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, name, ?limit, "cache call timed out");
                return SyncStatus::TIMED_OUT;
            }
        },
        None => call.await,
    };

    let Ok(result) = outcome else {
        tracing::error!(operation, name, "cache call panicked");
        return SyncStatus::FAILED;
    };

    match result {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(
                operation,
                name,
                error = %e,
                retryable = e.is_retryable(),
                "cache call failed"
            );
            SyncStatus::FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfsdb_cache::CacheError;

    #[test]
    fn last_status_starts_unset() {
        let status = LastStatus::new();
        assert_eq!(status.get(), SyncStatus::UNSET);
        status.set(SyncStatus::SUCCESS);
        assert_eq!(status.get(), SyncStatus::SUCCESS);
    }

    #[tokio::test]
    async fn settle_passes_status_through() {
        let status = settle("sync", "a.db_bak", None, async {
            Ok::<_, CacheError>(SyncStatus::from_code(5))
        })
        .await;
        assert_eq!(status, SyncStatus::from_code(5));
    }

    #[tokio::test]
    async fn settle_folds_errors() {
        let status = settle("push", "a.db_bak-1", None, async {
            Err::<SyncStatus, _>(CacheError::unavailable("offline"))
        })
        .await;
        assert_eq!(status, SyncStatus::FAILED);
    }

    #[tokio::test]
    async fn settle_folds_timeouts() {
        let status = settle(
            "sync",
            "a.db_bak",
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, CacheError>(SyncStatus::SUCCESS)
            },
        )
        .await;
        assert_eq!(status, SyncStatus::TIMED_OUT);
    }

    async fn exploding_call() -> CacheResult<SyncStatus> {
        panic!("cache exploded");
    }

    #[test]
    fn settle_folds_panics() {
        let status =
            futures::executor::block_on(settle("push", "a.db_bak-1", None, exploding_call()));
        assert_eq!(status, SyncStatus::FAILED);
    }

    #[test]
    fn settle_without_runtime_ignores_timeout() {
        let status = futures::executor::block_on(settle(
            "sync",
            "a.db_bak",
            Some(Duration::from_millis(10)),
            async { Ok::<_, CacheError>(SyncStatus::SUCCESS) },
        ));
        assert_eq!(status, SyncStatus::SUCCESS);
    }
}
