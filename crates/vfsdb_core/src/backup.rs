//! Backup after save.
//!
//! Every save that commits at least one entity produces a uniquely named
//! artifact next to the live file and hands it to the external cache:
//!
//! ```text
//! app.db  --swap-->  app.db_bak-1a2b3c4d  --push-->  cache["app.db"]
//! ```
//!
//! Names carry a random suffix so concurrent saves on different contexts
//! never write the same artifact. Failures are logged and recorded in the
//! factory's status; the save that triggered the backup has already
//! committed and is never rolled back.

use crate::context::DbContext;
use crate::state::PersistenceState;
use crate::status::settle;
use std::sync::Arc;
use uuid::Uuid;
use vfsdb_cache::{SyncStatus, BACKUP_MARKER};

/// Returns the name the startup restore pulls from the cache.
///
/// ```
/// assert_eq!(vfsdb_core::backup_name("app.db"), "app.db_bak");
/// ```
#[must_use]
pub fn backup_name(filename: &str) -> String {
    format!("{filename}{BACKUP_MARKER}")
}

/// Returns a fresh artifact name `<filename>_bak-<8 hex chars>`.
#[must_use]
pub fn artifact_name(filename: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", backup_name(filename), &id[..8])
}

/// Pushes a backup after every committing save.
#[derive(Debug, Clone)]
pub(crate) struct BackupCoordinator {
    state: Arc<PersistenceState>,
}

impl BackupCoordinator {
    pub(crate) fn new(state: Arc<PersistenceState>) -> Self {
        Self { state }
    }

    pub(crate) fn record_failure(&self) {
        self.state.last_status.set(SyncStatus::FAILED);
    }

    /// Runs the backup for a save of `saved` entities.
    ///
    /// Returns the push status, or `None` when nothing was pushed.
    pub(crate) async fn on_saved(&self, ctx: &dyn DbContext, saved: usize) -> Option<SyncStatus> {
        let state = &self.state;
        if let Err(e) = ctx.close_connection().await {
            tracing::warn!(
                filename = %state.filename,
                error = %e,
                "failed to close connection before backup"
            );
        }
        state.await_startup().await;

        if saved == 0 {
            tracing::debug!(filename = %state.filename, "nothing saved, skipping backup");
            return None;
        }

        let artifact = artifact_name(&state.filename);
        if let Err(e) = state.swap.swap(&state.filename, &artifact) {
            tracing::error!(
                filename = %state.filename,
                artifact = %artifact,
                error = %e,
                "failed to snapshot database for backup"
            );
            state.last_status.set(SyncStatus::FAILED);
            return Some(SyncStatus::FAILED);
        }

        let status = settle(
            "push",
            &artifact,
            state.cache_timeout,
            state.cache.push_from_local(&artifact),
        )
        .await;
        state.last_status.set(status);

        if status.is_success() {
            tracing::info!(filename = %state.filename, %artifact, saved, "backup pushed");
        } else {
            tracing::warn!(
                filename = %state.filename,
                %artifact,
                %status,
                "backup push did not succeed"
            );
        }
        Some(status)
    }
}
