//! Single-flight startup barrier.
//!
//! The restore launched when a factory is built is stored here as a shared
//! one-shot ticket. Every entry point that needs a ready database drains the
//! barrier first:
//!
//! - all callers that find the ticket await the *same* restore, which runs once
//! - each of them observes the same status
//! - the first caller to finish clears the ticket; after that a drain is a
//!   no-op that returns `None`
//!
//! The ticket is cloned under the lock and awaited without it, so a slow
//! restore never blocks the lock itself.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use vfsdb_cache::SyncStatus;

type Ticket = Shared<BoxFuture<'static, SyncStatus>>;

/// Gate that holds back database access until the startup restore is done.
pub struct StartupBarrier {
    pending: Mutex<Option<Ticket>>,
}

impl StartupBarrier {
    /// Launches `restore` and guards on it.
    ///
    /// Inside a Tokio runtime the restore is spawned immediately; otherwise it
    /// starts when the barrier is first drained.
    pub fn launch<F>(restore: F) -> Self
    where
        F: Future<Output = SyncStatus> + Send + 'static,
    {
        let ticket = restore.boxed().shared();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(ticket.clone());
        }
        Self {
            pending: Mutex::new(Some(ticket)),
        }
    }

    /// Creates a barrier with nothing to wait for.
    pub fn ready() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Waits for the startup restore if it has not been consumed yet.
    ///
    /// Returns the restore status for callers that found the ticket, `None`
    /// once the barrier has been drained.
    pub async fn drain(&self) -> Option<SyncStatus> {
        let ticket = self.pending.lock().clone()?;
        let status = ticket.await;
        if self.pending.lock().take().is_some() {
            tracing::debug!(%status, "startup barrier drained");
        }
        Some(status)
    }

    /// Blocking variant of [`StartupBarrier::drain`].
    ///
    /// Must not be called from a thread that drives an async runtime.
    pub fn drain_blocking(&self) -> Option<SyncStatus> {
        futures::executor::block_on(self.drain())
    }

    /// Returns true once the ticket has been consumed.
    pub fn is_drained(&self) -> bool {
        self.pending.lock().is_none()
    }
}

impl std::fmt::Debug for StartupBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupBarrier")
            .field("drained", &self.is_drained())
            .finish()
    }
}
