//! External cache abstraction.

use crate::error::CacheResult;
use crate::status::SyncStatus;
use async_trait::async_trait;
use std::time::Duration;

/// Marker separating a database filename from its backup suffix.
pub const BACKUP_MARKER: &str = "_bak";

/// An external cache is the durable tier behind the local virtual filesystem.
///
/// This trait abstracts the storage medium (browser cache storage, a host
/// directory, a mock for testing, etc.). Both operations move whole files
/// between the local filesystem and durable storage, keyed by [`cache_key`].
#[async_trait]
pub trait ExternalCache: Send + Sync {
    /// Pulls the durable blob for `name` into the local filesystem under `name`.
    ///
    /// Returns [`SyncStatus::SUCCESS`] if a blob was installed, or a non-zero
    /// status (usually [`SyncStatus::MISSING`]) if there was none.
    async fn sync_into_local(&self, name: &str) -> CacheResult<SyncStatus>;

    /// Pushes the local file `name` into durable storage.
    ///
    /// Returns [`SyncStatus::SUCCESS`] once the cache has taken ownership of
    /// the file.
    async fn push_from_local(&self, name: &str) -> CacheResult<SyncStatus>;
}

/// Returns the durable key for a local file name.
///
/// The name is cut at its last [`BACKUP_MARKER`]; names without the marker are
/// their own key.
///
/// ```
/// use vfsdb_cache::cache_key;
///
/// assert_eq!(cache_key("app.db_bak"), "app.db");
/// assert_eq!(cache_key("app.db_bak-1a2b3c4d"), "app.db");
/// assert_eq!(cache_key("app.db"), "app.db");
/// ```
#[must_use]
pub fn cache_key(name: &str) -> &str {
    match name.rfind(BACKUP_MARKER) {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

/// Waits for `delay` on the Tokio timer, or blocks the thread when no
/// runtime is running (contexts saved through `block_on`).
pub(crate) async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    if tokio::runtime::Handle::try_current().is_ok() {
        tokio::time::sleep(delay).await;
    } else {
        std::thread::sleep(delay);
    }
}
