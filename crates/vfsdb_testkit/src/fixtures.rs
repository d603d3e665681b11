//! Test fixtures and process-restart helpers.
//!
//! A sandboxed process sees two storage tiers: an ephemeral local
//! filesystem that is wiped on every restart, and a durable cache that is
//! not. The harnesses here own both and can "restart" by keeping the
//! durable tier and handing out a fresh local one.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use vfsdb_cache::{BlobCache, CacheConfig};
use vfsdb_core::table::{Schema, TableContext, TableEngine};
use vfsdb_core::{ContextProvider, CoreError, CoreResult, FactoryConfig, PersistentContextFactory};
use vfsdb_storage::{CopySwap, InMemoryFs, VirtualFs};

/// Factory type produced by the harnesses.
pub type TableFactory<S> = PersistentContextFactory<TableEngine<S>>;

/// One simulated process: local filesystem plus a shared durable tier.
pub struct TestHarness {
    local: Arc<InMemoryFs>,
    durable: Arc<InMemoryFs>,
    cache: Arc<BlobCache>,
}

impl TestHarness {
    /// Creates a first process with empty local and durable storage.
    pub fn new() -> Self {
        Self::with_durable(Arc::new(InMemoryFs::new()))
    }

    /// Creates a process over an existing durable tier.
    pub fn with_durable(durable: Arc<InMemoryFs>) -> Self {
        let local = Arc::new(InMemoryFs::new());
        let cache = Arc::new(BlobCache::new(durable.clone(), local.clone()));
        Self {
            local,
            durable,
            cache,
        }
    }

    /// Simulates a restart: same durable tier, empty local filesystem.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self::with_durable(self.durable.clone())
    }

    /// Returns the ephemeral local filesystem.
    pub fn local(&self) -> &Arc<InMemoryFs> {
        &self.local
    }

    /// Returns the durable tier.
    pub fn durable(&self) -> &Arc<InMemoryFs> {
        &self.durable
    }

    /// Returns the cache between the two tiers.
    pub fn cache(&self) -> &Arc<BlobCache> {
        &self.cache
    }

    /// Returns a swap over the local filesystem.
    pub fn swap(&self) -> Arc<CopySwap> {
        Arc::new(CopySwap::new(self.local.clone()))
    }

    /// Creates a table engine on the local filesystem.
    pub fn engine<S: Schema>(&self, connection_string: &str) -> TableEngine<S> {
        TableEngine::new(self.local.clone(), connection_string)
    }

    /// Creates a persistence factory with the default configuration.
    pub fn factory<S: Schema>(&self, connection_string: &str) -> TableFactory<S> {
        self.factory_with_config(connection_string, FactoryConfig::default())
    }

    /// Creates a persistence factory with a custom configuration.
    pub fn factory_with_config<S: Schema>(
        &self,
        connection_string: &str,
        config: FactoryConfig,
    ) -> TableFactory<S> {
        PersistentContextFactory::with_config(
            self.engine(connection_string),
            self.cache.clone(),
            self.swap(),
            config,
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A harness whose durable tier is a temporary host directory.
pub struct DirectoryHarness {
    local: Arc<InMemoryFs>,
    cache: Arc<BlobCache>,
    root: PathBuf,
    temp_dir: Arc<TempDir>,
}

impl DirectoryHarness {
    /// Creates a harness in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::open(Arc::new(temp_dir))
    }

    fn open(temp_dir: Arc<TempDir>) -> Self {
        let root = temp_dir.path().to_path_buf();
        let local = Arc::new(InMemoryFs::new());
        let cache = BlobCache::open_directory(&root, local.clone(), CacheConfig::default())
            .expect("Failed to open directory cache");
        Self {
            local,
            cache: Arc::new(cache),
            root,
            temp_dir,
        }
    }

    /// Simulates a restart over the same directory.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self::open(self.temp_dir.clone())
    }

    /// Returns the directory holding the durable tier.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the ephemeral local filesystem.
    pub fn local(&self) -> &Arc<InMemoryFs> {
        &self.local
    }

    /// Creates a persistence factory with the default configuration.
    pub fn factory<S: Schema>(&self, connection_string: &str) -> TableFactory<S> {
        PersistentContextFactory::new(
            TableEngine::new(self.local.clone(), connection_string),
            self.cache.clone(),
            Arc::new(CopySwap::new(self.local.clone())),
        )
    }
}

impl Default for DirectoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine whose context creation always fails.
///
/// Useful to check that engine errors reach the caller and that filename
/// resolution falls back to the default.
pub struct FailingEngine<S: Schema> {
    attempts: AtomicUsize,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> FailingEngine<S> {
    /// Creates a failing engine.
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            _schema: PhantomData,
        }
    }

    /// Returns how many contexts were requested.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl<S: Schema> Default for FailingEngine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> ContextProvider for FailingEngine<S> {
    type Context = TableContext<S>;

    fn create_context(&self) -> CoreResult<TableContext<S>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::engine(std::io::Error::other("engine unavailable")))
    }
}

/// Reads and decodes the durable copy stored for `filename`.
pub fn durable_image(
    durable: &dyn VirtualFs,
    filename: &str,
) -> CoreResult<vfsdb_core::table::DatabaseImage> {
    vfsdb_core::table::DatabaseImage::load(durable, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::test_schema!(HarnessItems);

    #[test]
    fn restart_keeps_durable_and_drops_local() {
        let first = TestHarness::new();
        first.local().write("app.db", b"local").unwrap();
        first.durable().write("app.db", b"durable").unwrap();

        let second = first.restart();
        assert!(second.local().is_empty());
        assert_eq!(second.durable().read("app.db").unwrap(), b"durable");
    }

    #[test]
    fn harness_factory_uses_local_fs() {
        let harness = TestHarness::new();
        let factory = harness.factory::<HarnessItems>("Data Source=harness.db");
        let _ctx = factory.create_context().unwrap();
        assert!(harness.local().exists("harness.db").unwrap());
    }

    #[test]
    fn failing_engine_fails() {
        let engine = FailingEngine::<HarnessItems>::new();
        assert!(matches!(engine.create_context(), Err(CoreError::Engine(_))));
        assert_eq!(engine.attempts(), 1);
    }
}
