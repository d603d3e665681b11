//! A scriptable cache for testing.

use crate::cache::{pause, ExternalCache};
use crate::error::{CacheError, CacheResult};
use crate::status::SyncStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vfsdb_storage::VirtualFs;

/// A mock cache for testing.
///
/// Every call is recorded. Statuses, failures and latency are scripted:
/// - `sync_into_local` installs the restore blob (if set and a local
///   filesystem is attached) and reports success, otherwise reports the
///   scripted sync status (default [`SyncStatus::MISSING`])
/// - `push_from_local` reports the scripted push status (default
///   [`SyncStatus::SUCCESS`]) and never touches the filesystem
#[derive(Default)]
pub struct MockCache {
    local: Option<Arc<dyn VirtualFs>>,
    restore_blob: Mutex<Option<Vec<u8>>>,
    sync_status: Mutex<Option<SyncStatus>>,
    push_status: Mutex<Option<SyncStatus>>,
    fail_sync: AtomicBool,
    fail_push: AtomicBool,
    delay: Mutex<Duration>,
    sync_calls: Mutex<Vec<String>>,
    push_calls: Mutex<Vec<String>>,
}

impl MockCache {
    /// Creates a mock that is not attached to any filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that restores into `local`.
    pub fn with_local(local: Arc<dyn VirtualFs>) -> Self {
        Self {
            local: Some(local),
            ..Self::default()
        }
    }

    /// Sets the blob `sync_into_local` installs.
    pub fn set_restore_blob(&self, data: impl Into<Vec<u8>>) {
        *self.restore_blob.lock() = Some(data.into());
    }

    /// Sets the status `sync_into_local` reports when it installs nothing.
    pub fn set_sync_status(&self, status: SyncStatus) {
        *self.sync_status.lock() = Some(status);
    }

    /// Sets the status `push_from_local` reports.
    pub fn set_push_status(&self, status: SyncStatus) {
        *self.push_status.lock() = Some(status);
    }

    /// Makes `sync_into_local` fail with an error.
    pub fn set_fail_sync(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Makes `push_from_local` fail with an error.
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Sets the latency of every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Returns the names passed to `sync_into_local`, in order.
    pub fn sync_calls(&self) -> Vec<String> {
        self.sync_calls.lock().clone()
    }

    /// Returns the names passed to `push_from_local`, in order.
    pub fn push_calls(&self) -> Vec<String> {
        self.push_calls.lock().clone()
    }

    async fn lag(&self) {
        let delay = *self.delay.lock();
        pause(delay).await;
    }
}

impl std::fmt::Debug for MockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCache")
            .field("sync_calls", &self.sync_calls.lock().len())
            .field("push_calls", &self.push_calls.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExternalCache for MockCache {
    async fn sync_into_local(&self, name: &str) -> CacheResult<SyncStatus> {
        self.sync_calls.lock().push(name.to_string());
        self.lag().await;

        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("mock sync failure"));
        }

        let blob = self.restore_blob.lock().clone();
        if let (Some(local), Some(blob)) = (&self.local, blob) {
            local.write(name, &blob)?;
            return Ok(SyncStatus::SUCCESS);
        }

        Ok(self.sync_status.lock().unwrap_or(SyncStatus::MISSING))
    }

    async fn push_from_local(&self, name: &str) -> CacheResult<SyncStatus> {
        self.push_calls.lock().push(name.to_string());
        self.lag().await;

        if self.fail_push.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("mock push failure"));
        }

        Ok(self.push_status.lock().unwrap_or(SyncStatus::SUCCESS))
    }
}
