//! Per-factory persistence state shared with the hooks.

use crate::barrier::StartupBarrier;
use crate::status::LastStatus;
use std::sync::Arc;
use std::time::Duration;
use vfsdb_cache::{ExternalCache, SyncStatus};
use vfsdb_storage::Swap;

pub(crate) struct PersistenceState {
    pub(crate) filename: String,
    pub(crate) cache: Arc<dyn ExternalCache>,
    pub(crate) swap: Arc<dyn Swap>,
    pub(crate) barrier: StartupBarrier,
    pub(crate) last_status: Arc<LastStatus>,
    pub(crate) cache_timeout: Option<Duration>,
}

impl PersistenceState {
    /// Waits for the startup restore (no-op once drained).
    pub(crate) async fn await_startup(&self) -> Option<SyncStatus> {
        self.barrier.drain().await
    }

    pub(crate) fn await_startup_blocking(&self) -> Option<SyncStatus> {
        self.barrier.drain_blocking()
    }

    pub(crate) fn last_status(&self) -> SyncStatus {
        self.last_status.get()
    }
}

impl std::fmt::Debug for PersistenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceState")
            .field("filename", &self.filename)
            .field("barrier", &self.barrier)
            .field("last_status", &self.last_status())
            .finish_non_exhaustive()
    }
}
