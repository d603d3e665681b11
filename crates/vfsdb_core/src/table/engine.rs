//! The table engine: a [`ContextProvider`] for table contexts.

use super::context::TableContext;
use super::Schema;
use crate::context::ContextProvider;
use crate::error::CoreResult;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vfsdb_storage::VirtualFs;

/// Creates [`TableContext`]s over one virtual filesystem.
pub struct TableEngine<S: Schema> {
    fs: Arc<dyn VirtualFs>,
    connection_string: String,
    contexts_created: AtomicUsize,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> TableEngine<S> {
    /// Creates an engine for the database named by `connection_string`.
    pub fn new(fs: Arc<dyn VirtualFs>, connection_string: impl Into<String>) -> Self {
        Self {
            fs,
            connection_string: connection_string.into(),
            contexts_created: AtomicUsize::new(0),
            _schema: PhantomData,
        }
    }

    /// Returns the connection string handed to every context.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Returns the filesystem holding the database.
    pub fn fs(&self) -> &Arc<dyn VirtualFs> {
        &self.fs
    }

    /// Returns how many contexts this engine has created.
    pub fn contexts_created(&self) -> usize {
        self.contexts_created.load(Ordering::Relaxed)
    }
}

impl<S: Schema> ContextProvider for TableEngine<S> {
    type Context = TableContext<S>;

    fn create_context(&self) -> CoreResult<TableContext<S>> {
        self.contexts_created.fetch_add(1, Ordering::Relaxed);
        Ok(TableContext::new(
            self.fs.clone(),
            self.connection_string.clone(),
        ))
    }
}

impl<S: Schema> std::fmt::Debug for TableEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEngine")
            .field("schema", &S::NAME)
            .field("connection_string", &self.connection_string)
            .field("contexts_created", &self.contexts_created())
            .finish_non_exhaustive()
    }
}
