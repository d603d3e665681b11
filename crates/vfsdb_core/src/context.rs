//! Engine-facing traits: context providers, contexts and save hooks.
//!
//! The persistence layer never looks inside the database engine. It needs an
//! engine to hand out contexts ([`ContextProvider`]), each context to report
//! its connection string, create its schema, close its connection and list
//! its tracked entities ([`DbContext`]), and every context to call registered
//! [`SaveHooks`] around a save.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Change-tracking state of an entity within a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Not tracked by the context.
    Detached,
    /// Tracked and identical to the stored row.
    Unchanged,
    /// New; will be inserted on save.
    Added,
    /// Changed; will be updated on save.
    Modified,
    /// Marked for removal on save.
    Deleted,
}

impl EntityState {
    /// Returns true if saving would write this entity.
    #[must_use]
    pub fn is_pending(self) -> bool {
        !matches!(self, EntityState::Unchanged | EntityState::Detached)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A snapshot of one tracked entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntry {
    /// Entity type or table name.
    pub entity: String,
    /// Primary key, rendered as text.
    pub key: String,
    /// Current tracking state.
    pub state: EntityState,
    /// Multi-line rendering of the entity with original and current values.
    pub long_view: String,
}

/// A state transition of one tracked entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Entity type or table name.
    pub entity: String,
    /// Primary key, rendered as text.
    pub key: String,
    /// State before the transition.
    pub old_state: EntityState,
    /// State after the transition.
    pub new_state: EntityState,
}

/// A unit of work against the database, produced by a [`ContextProvider`].
///
/// The caller owns a context and decides when to drop it.
#[async_trait]
pub trait DbContext: Send + Sync + 'static {
    /// Returns the connection string this context was configured with.
    fn connection_string(&self) -> Option<String>;

    /// Creates the schema if needed. Returns true if anything was created.
    ///
    /// Must be idempotent: calling it on an existing database succeeds.
    fn ensure_created(&self) -> CoreResult<bool>;

    /// Async variant of [`DbContext::ensure_created`].
    async fn ensure_created_async(&self) -> CoreResult<bool> {
        self.ensure_created()
    }

    /// Closes the live connection, releasing the database file.
    ///
    /// The context stays usable; the next operation reopens the connection.
    async fn close_connection(&self) -> CoreResult<()>;

    /// Returns every tracked entity.
    fn entries(&self) -> Vec<TrackedEntry>;

    /// Registers hooks that this context calls around every save.
    fn attach_hooks(&self, hooks: Arc<dyn SaveHooks>);
}

/// An engine that creates contexts.
#[async_trait]
pub trait ContextProvider: Send + Sync + 'static {
    /// The context type produced.
    type Context: DbContext;

    /// Creates a new context.
    fn create_context(&self) -> CoreResult<Self::Context>;

    /// Async variant of [`ContextProvider::create_context`].
    async fn create_context_async(&self) -> CoreResult<Self::Context> {
        self.create_context()
    }
}

/// Callbacks a context makes around a save.
///
/// Engines call these in order: `saving_changes` before writing; then either
/// `save_changes_failed`, or one `state_changed` per accepted transition
/// followed by `saved_changes` (awaited before the save returns).
/// `state_changed` also fires whenever tracking changes an entity's state.
///
/// Hooks must not fail. Engines should isolate a panicking hook and carry on.
#[async_trait]
pub trait SaveHooks: Send + Sync {
    /// Called before a save writes anything.
    fn saving_changes(&self, _ctx: &dyn DbContext) {}

    /// Called when a save fails. Nothing was written.
    fn save_changes_failed(&self, _ctx: &dyn DbContext, _error: &CoreError) {}

    /// Called after a save committed `entities_saved` entities.
    async fn saved_changes(&self, _ctx: &dyn DbContext, _entities_saved: usize) {}

    /// Called when a tracked entity changes state.
    fn state_changed(&self, _ctx: &dyn DbContext, _change: &StateChange) {}
}
