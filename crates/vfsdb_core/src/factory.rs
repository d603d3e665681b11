//! The persistence factory: the public entry point of vfsdb.

use crate::backup::{backup_name, BackupCoordinator};
use crate::barrier::StartupBarrier;
use crate::config::FactoryConfig;
use crate::context::{ContextProvider, DbContext, SaveHooks};
use crate::error::CoreResult;
use crate::filename;
use crate::hooks::PersistenceHooks;
use crate::restore::Restore;
use crate::state::PersistenceState;
use crate::status::LastStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vfsdb_cache::{ExternalCache, SyncStatus};
use vfsdb_storage::Swap;

/// Hands out contexts whose database survives process restarts.
///
/// Building a factory resolves the database filename and launches the
/// startup restore. Every context it creates:
///
/// - is created only after the restore has finished
/// - has had its schema created (first context only)
/// - pushes a backup to the external cache after each committing save
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use vfsdb_cache::BlobCache;
/// use vfsdb_core::table::{Schema, TableEngine};
/// use vfsdb_core::PersistentContextFactory;
/// use vfsdb_storage::{CopySwap, InMemoryFs};
///
/// struct Notes;
/// impl Schema for Notes {
///     const NAME: &'static str = "notes";
///     const TABLES: &'static [&'static str] = &["notes"];
/// }
///
/// let local = Arc::new(InMemoryFs::new());
/// let engine = TableEngine::<Notes>::new(local.clone(), "Data Source=notes.db");
/// let factory = PersistentContextFactory::new(
///     engine,
///     Arc::new(BlobCache::in_memory(local.clone())),
///     Arc::new(CopySwap::new(local)),
/// );
///
/// let ctx = factory.create_context().unwrap();
/// ctx.insert("notes", "1", serde_json::json!({ "text": "hello" })).unwrap();
/// assert_eq!(ctx.save_changes().unwrap(), 1);
/// assert!(factory.last_status().is_success());
/// ```
pub struct PersistentContextFactory<P: ContextProvider> {
    provider: P,
    config: FactoryConfig,
    state: Arc<PersistenceState>,
    hooks: Arc<PersistenceHooks>,
    initialized: AtomicBool,
}

impl<P: ContextProvider> PersistentContextFactory<P> {
    /// Creates a factory with the default configuration.
    pub fn new(provider: P, cache: Arc<dyn ExternalCache>, swap: Arc<dyn Swap>) -> Self {
        Self::with_config(provider, cache, swap, FactoryConfig::default())
    }

    /// Creates a factory with a custom configuration.
    ///
    /// Inside a Tokio runtime the restore starts right away; otherwise it runs
    /// on the first call that needs the database.
    pub fn with_config(
        provider: P,
        cache: Arc<dyn ExternalCache>,
        swap: Arc<dyn Swap>,
        config: FactoryConfig,
    ) -> Self {
        let filename = filename::resolve(&provider, &config.default_filename);
        let last_status = Arc::new(LastStatus::new());

        let restore = Restore {
            filename: filename.clone(),
            cache: cache.clone(),
            swap: swap.clone(),
            last_status: last_status.clone(),
            timeout: config.cache_timeout,
        };
        let barrier = StartupBarrier::launch(restore.run());

        let state = Arc::new(PersistenceState {
            filename,
            cache,
            swap,
            barrier,
            last_status,
            cache_timeout: config.cache_timeout,
        });
        let hooks = Arc::new(PersistenceHooks::new(BackupCoordinator::new(state.clone())));

        tracing::debug!(filename = %state.filename, "persistence factory created");
        Self {
            provider,
            config,
            state,
            hooks,
            initialized: AtomicBool::new(false),
        }
    }

    /// Creates a context, blocking until the startup restore has finished.
    ///
    /// Must not be called from a thread that drives an async runtime; use
    /// [`PersistentContextFactory::create_context_async`] there.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the context or the schema cannot be
    /// created.
    pub fn create_context(&self) -> CoreResult<P::Context> {
        self.state.await_startup_blocking();
        let ctx = self.provider.create_context()?;
        if self.needs_schema() {
            ctx.ensure_created()?;
            self.initialized.store(true, Ordering::Release);
        }
        Ok(self.attach(ctx))
    }

    /// Creates a context once the startup restore has finished.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the context or the schema cannot be
    /// created.
    pub async fn create_context_async(&self) -> CoreResult<P::Context> {
        self.state.await_startup().await;
        let ctx = self.provider.create_context_async().await?;
        if self.needs_schema() {
            ctx.ensure_created_async().await?;
            self.initialized.store(true, Ordering::Release);
        }
        Ok(self.attach(ctx))
    }

    fn needs_schema(&self) -> bool {
        self.config.ensure_created && !self.initialized.load(Ordering::Acquire)
    }

    fn attach(&self, ctx: P::Context) -> P::Context {
        let hooks: Arc<dyn SaveHooks> = self.hooks.clone();
        ctx.attach_hooks(hooks);
        ctx
    }

    /// Waits for the startup restore and returns the current status.
    pub async fn wait_ready(&self) -> SyncStatus {
        self.state.await_startup().await;
        self.state.last_status()
    }

    /// Returns the resolved database filename.
    pub fn filename(&self) -> &str {
        &self.state.filename
    }

    /// Returns the name the startup restore pulls from the cache.
    pub fn backup_name(&self) -> String {
        backup_name(&self.state.filename)
    }

    /// Returns the status of the most recent restore or backup.
    pub fn last_status(&self) -> SyncStatus {
        self.state.last_status()
    }

    /// Returns true once schema creation has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Returns true once the startup restore has been awaited.
    pub fn is_ready(&self) -> bool {
        self.state.barrier.is_drained()
    }

    /// Returns the wrapped engine.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }
}

impl<P: ContextProvider> std::fmt::Debug for PersistentContextFactory<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentContextFactory")
            .field("state", &self.state)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
