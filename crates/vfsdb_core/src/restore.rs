//! Startup restore from the external cache.
//!
//! Runs once per factory, before any context touches the live file:
//!
//! 1. ask the cache to pull `<filename>_bak` into the local filesystem
//! 2. on [`SyncStatus::SUCCESS`], swap the pulled copy onto `<filename>`
//!    and discard the pulled copy
//! 3. record the outcome as the factory's last status
//!
//! Anything other than success leaves the live file alone and the engine
//! starts from whatever is (or is not) there.

use crate::backup::backup_name;
use crate::status::{settle, LastStatus};
use std::sync::Arc;
use std::time::Duration;
use vfsdb_cache::{ExternalCache, SyncStatus};
use vfsdb_storage::Swap;

/// Everything the restore needs, owned so it can run on a spawned task.
pub(crate) struct Restore {
    pub(crate) filename: String,
    pub(crate) cache: Arc<dyn ExternalCache>,
    pub(crate) swap: Arc<dyn Swap>,
    pub(crate) last_status: Arc<LastStatus>,
    pub(crate) timeout: Option<Duration>,
}

impl Restore {
    pub(crate) async fn run(self) -> SyncStatus {
        let backup = backup_name(&self.filename);
        let mut status = settle(
            "sync",
            &backup,
            self.timeout,
            self.cache.sync_into_local(&backup),
        )
        .await;

        if status.is_success() {
            if let Err(e) = self.swap.swap(&backup, &self.filename) {
                tracing::error!(
                    filename = %self.filename,
                    backup = %backup,
                    error = %e,
                    "failed to install restored backup"
                );
                status = SyncStatus::FAILED;
            } else if let Err(e) = self.swap.discard(&backup) {
                tracing::warn!(
                    backup = %backup,
                    error = %e,
                    "failed to discard restored copy"
                );
            }
        }

        self.last_status.set(status);
        if status.is_success() {
            tracing::info!(filename = %self.filename, "restored database from cache");
        } else {
            tracing::info!(filename = %self.filename, %status, "no backup restored");
        }
        status
    }
}
