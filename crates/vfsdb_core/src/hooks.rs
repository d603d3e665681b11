//! Lifecycle hooks attached to every context a factory hands out.

use crate::backup::BackupCoordinator;
use crate::context::{DbContext, SaveHooks, StateChange};
use crate::error::CoreError;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Logs tracked changes around saves and triggers the backup after one.
#[derive(Debug)]
pub(crate) struct PersistenceHooks {
    backup: BackupCoordinator,
}

impl PersistenceHooks {
    pub(crate) fn new(backup: BackupCoordinator) -> Self {
        Self { backup }
    }
}

fn trace_pending(ctx: &dyn DbContext, phase: &'static str) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for entry in ctx.entries().iter().filter(|e| e.state.is_pending()) {
        tracing::debug!(
            phase,
            entity = %entry.entity,
            key = %entry.key,
            state = %entry.state,
            "\n{}",
            entry.long_view
        );
    }
}

#[async_trait]
impl SaveHooks for PersistenceHooks {
    fn saving_changes(&self, ctx: &dyn DbContext) {
        trace_pending(ctx, "saving");
    }

    fn save_changes_failed(&self, ctx: &dyn DbContext, error: &CoreError) {
        tracing::debug!(error = %error, "save failed");
        trace_pending(ctx, "failed");
    }

    async fn saved_changes(&self, ctx: &dyn DbContext, entities_saved: usize) {
        let run = AssertUnwindSafe(self.backup.on_saved(ctx, entities_saved))
            .catch_unwind()
            .await;
        if run.is_err() {
            tracing::error!(entities_saved, "backup panicked");
            self.backup.record_failure();
        }
    }

    fn state_changed(&self, _ctx: &dyn DbContext, change: &StateChange) {
        tracing::trace!(
            entity = %change.entity,
            key = %change.key,
            from = %change.old_state,
            to = %change.new_state,
            "entity state changed"
        );
    }
}
