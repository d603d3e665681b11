//! Table contexts: change-tracked units of work.

use super::image::{DatabaseImage, Rows};
use super::tracker::ChangeTracker;
use super::Schema;
use crate::context::{DbContext, EntityState, SaveHooks, StateChange, TrackedEntry};
use crate::error::{CoreError, CoreResult};
use crate::filename::{filename_from_connection_string, DEFAULT_FILENAME};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use vfsdb_storage::VirtualFs;

/// A unit of work over the tables of schema `S`.
///
/// Changes are tracked in memory and written by
/// [`TableContext::save_changes`]. The database image is loaded on first use
/// (the "connection") and dropped again by [`DbContext::close_connection`].
pub struct TableContext<S: Schema> {
    fs: Arc<dyn VirtualFs>,
    connection_string: String,
    filename: String,
    connection: Mutex<Option<DatabaseImage>>,
    tracker: Mutex<ChangeTracker>,
    hooks: Mutex<Vec<Arc<dyn SaveHooks>>>,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> TableContext<S> {
    pub(crate) fn new(fs: Arc<dyn VirtualFs>, connection_string: String) -> Self {
        let filename = filename_from_connection_string(&connection_string)
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        Self {
            fs,
            connection_string,
            filename,
            connection: Mutex::new(None),
            tracker: Mutex::new(ChangeTracker::default()),
            hooks: Mutex::new(Vec::new()),
            _schema: PhantomData,
        }
    }

    /// Returns the database file this context reads and writes.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns true while the database image is loaded.
    pub fn is_connection_open(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Runs `f` against the open connection, opening it if needed.
    fn with_image<T>(&self, f: impl FnOnce(&DatabaseImage) -> CoreResult<T>) -> CoreResult<T> {
        let mut connection = self.connection.lock();
        if connection.is_none() {
            *connection = Some(DatabaseImage::load(self.fs.as_ref(), &self.filename)?);
            tracing::trace!(filename = %self.filename, "connection opened");
        }
        match connection.as_ref() {
            Some(image) => f(image),
            None => Err(CoreError::DatabaseNotCreated {
                filename: self.filename.clone(),
            }),
        }
    }

    fn check_table(table: &str) -> CoreResult<()> {
        if S::TABLES.contains(&table) {
            Ok(())
        } else {
            Err(CoreError::schema_missing(table))
        }
    }

    fn stored_row(&self, table: &str, key: &str) -> CoreResult<Option<Value>> {
        self.with_image(|image| Ok(image.get(table, key)?.cloned()))
    }

    /// Tracks a new row, written on the next save.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaMissing`] for an unknown table, and
    /// [`CoreError::DuplicateKey`] if this context already tracks the key.
    pub fn insert(&self, table: &str, key: &str, value: Value) -> CoreResult<()> {
        Self::check_table(table)?;
        let change = self.tracker.lock().add(table, key, value);
        match change {
            Some(change) => {
                self.notify_state_changed(&change);
                Ok(())
            }
            None => Err(CoreError::duplicate_key(table, key)),
        }
    }

    /// Replaces the value of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotFound`] if the row neither is tracked nor
    /// exists in the database.
    pub fn update(&self, table: &str, key: &str, value: Value) -> CoreResult<()> {
        Self::check_table(table)?;
        if self.tracker.lock().state(table, key) == EntityState::Detached {
            self.attach_stored(table, key)?;
        }
        let change = self.tracker.lock().modify(table, key, value);
        match change {
            Some(Some(change)) => {
                self.notify_state_changed(&change);
                Ok(())
            }
            Some(None) => Ok(()),
            None => Err(CoreError::entity_not_found(table, key)),
        }
    }

    /// Marks a row for removal on the next save.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotFound`] if the row neither is tracked nor
    /// exists in the database.
    pub fn remove(&self, table: &str, key: &str) -> CoreResult<()> {
        Self::check_table(table)?;
        if self.tracker.lock().state(table, key) == EntityState::Detached {
            self.attach_stored(table, key)?;
        }
        let change = self.tracker.lock().delete(table, key);
        match change {
            Some(change) => {
                self.notify_state_changed(&change);
                Ok(())
            }
            None => Err(CoreError::entity_not_found(table, key)),
        }
    }

    /// Finds a row, preferring this context's tracked value.
    ///
    /// A stored row that is found starts being tracked as unchanged.
    pub fn find(&self, table: &str, key: &str) -> CoreResult<Option<Value>> {
        Self::check_table(table)?;
        if let Some(current) = self.tracker.lock().current(table, key) {
            return Ok(current.cloned());
        }
        match self.attach_stored(table, key) {
            Ok(value) => Ok(Some(value)),
            Err(CoreError::EntityNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns the committed rows of a table, ignoring unsaved changes.
    pub fn rows(&self, table: &str) -> CoreResult<Rows> {
        Self::check_table(table)?;
        self.with_image(|image| image.rows(table).cloned())
    }

    fn attach_stored(&self, table: &str, key: &str) -> CoreResult<Value> {
        let value = self
            .stored_row(table, key)?
            .ok_or_else(|| CoreError::entity_not_found(table, key))?;
        let change = self.tracker.lock().attach(table, key, value.clone());
        self.notify_state_changed(&change);
        Ok(value)
    }

    /// Saves every pending change, blocking the current thread.
    ///
    /// Must not be called from a thread that drives an async runtime.
    pub fn save_changes(&self) -> CoreResult<usize> {
        futures::executor::block_on(self.save_changes_async())
    }

    /// Saves every pending change and returns the number of rows written.
    ///
    /// Hooks run in order: before-save; then save-failed on error, or one
    /// state change per saved row followed by the awaited after-save hooks.
    ///
    /// # Errors
    ///
    /// Returns an error if a pending change conflicts with the stored
    /// database (unknown table, duplicate key, missing row) or the image
    /// cannot be written. Nothing is written in that case.
    pub async fn save_changes_async(&self) -> CoreResult<usize> {
        self.notify_saving();

        let accepted = match self.write_pending() {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::debug!(filename = %self.filename, error = %e, "save rejected");
                self.notify_failed(&e);
                return Err(e);
            }
        };

        let saved = accepted.len();
        for change in &accepted {
            self.notify_state_changed(change);
        }
        tracing::debug!(filename = %self.filename, saved, "changes saved");

        self.notify_saved(saved).await;
        Ok(saved)
    }

    /// Applies pending writes to a copy of the image and stores it.
    fn write_pending(&self) -> CoreResult<Vec<StateChange>> {
        let mut tracker = self.tracker.lock();
        let pending = tracker.pending();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        // validate against the file, not a possibly stale connection
        let mut image = DatabaseImage::load(self.fs.as_ref(), &self.filename)?;
        for write in pending {
            let rows = image.rows_mut(&write.table)?;
            match write.state {
                EntityState::Added => {
                    if rows.contains_key(&write.key) {
                        return Err(CoreError::duplicate_key(write.table, write.key));
                    }
                    rows.insert(write.key, write.value);
                }
                EntityState::Modified => {
                    let Some(row) = rows.get_mut(&write.key) else {
                        return Err(CoreError::entity_not_found(write.table, write.key));
                    };
                    *row = write.value;
                }
                EntityState::Deleted => {
                    if rows.remove(&write.key).is_none() {
                        return Err(CoreError::entity_not_found(write.table, write.key));
                    }
                }
                EntityState::Unchanged | EntityState::Detached => {}
            }
        }

        image.store(self.fs.as_ref(), &self.filename)?;
        *self.connection.lock() = Some(image);
        Ok(tracker.accept_all())
    }

    fn hooks(&self) -> Vec<Arc<dyn SaveHooks>> {
        self.hooks.lock().clone()
    }

    fn notify_saving(&self) {
        for hook in self.hooks() {
            isolate("saving_changes", || hook.saving_changes(self));
        }
    }

    fn notify_failed(&self, error: &CoreError) {
        for hook in self.hooks() {
            isolate("save_changes_failed", || hook.save_changes_failed(self, error));
        }
    }

    fn notify_state_changed(&self, change: &StateChange) {
        for hook in self.hooks() {
            isolate("state_changed", || hook.state_changed(self, change));
        }
    }

    async fn notify_saved(&self, saved: usize) {
        for hook in self.hooks() {
            let result = AssertUnwindSafe(hook.saved_changes(self, saved))
                .catch_unwind()
                .await;
            if result.is_err() {
                tracing::error!(hook = "saved_changes", "save hook panicked");
            }
        }
    }
}

fn isolate(hook: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(hook, "save hook panicked");
    }
}

#[async_trait]
impl<S: Schema> DbContext for TableContext<S> {
    fn connection_string(&self) -> Option<String> {
        Some(self.connection_string.clone())
    }

    fn ensure_created(&self) -> CoreResult<bool> {
        let mut connection = self.connection.lock();
        let (mut image, existed) = match DatabaseImage::load(self.fs.as_ref(), &self.filename) {
            Ok(image) => (image, true),
            Err(CoreError::DatabaseNotCreated { .. }) => (DatabaseImage::default(), false),
            Err(e) => return Err(e),
        };

        let mut created = !existed;
        for table in S::TABLES {
            created |= image.add_table(table);
        }
        if created {
            image.store(self.fs.as_ref(), &self.filename)?;
            tracing::info!(
                schema = S::NAME,
                filename = %self.filename,
                "database schema created"
            );
        }
        *connection = Some(image);
        Ok(created)
    }

    async fn close_connection(&self) -> CoreResult<()> {
        if self.connection.lock().take().is_some() {
            tracing::trace!(filename = %self.filename, "connection closed");
        }
        Ok(())
    }

    fn entries(&self) -> Vec<TrackedEntry> {
        self.tracker.lock().entries()
    }

    fn attach_hooks(&self, hooks: Arc<dyn SaveHooks>) {
        self.hooks.lock().push(hooks);
    }
}

impl<S: Schema> std::fmt::Debug for TableContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableContext")
            .field("schema", &S::NAME)
            .field("filename", &self.filename)
            .field("connection_open", &self.is_connection_open())
            .finish_non_exhaustive()
    }
}
