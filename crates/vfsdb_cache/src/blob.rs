//! Cache over a durable virtual filesystem.

use crate::cache::{cache_key, pause, ExternalCache};
use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::status::SyncStatus;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use vfsdb_storage::{DirectoryFs, InMemoryFs, VirtualFs};

/// An [`ExternalCache`] that keeps durable blobs in a second [`VirtualFs`].
///
/// The local filesystem is the sandbox's ephemeral one; the durable
/// filesystem survives process restarts. Share the same durable filesystem
/// between two caches to simulate a restart in tests:
///
/// ```rust
/// use std::sync::Arc;
/// use vfsdb_cache::BlobCache;
/// use vfsdb_storage::{InMemoryFs, VirtualFs};
///
/// let durable: Arc<dyn VirtualFs> = Arc::new(InMemoryFs::new());
///
/// let first_run = BlobCache::new(durable.clone(), Arc::new(InMemoryFs::new()));
/// let second_run = BlobCache::new(durable, Arc::new(InMemoryFs::new()));
/// # let _ = (first_run, second_run);
/// ```
///
/// Durable file names are the [`cache_key`] of the local name with `%`, `/`
/// and `\` percent-encoded, so `data/app.db` is stored as `data%2Fapp.db`
/// and every key is a single flat file.
pub struct BlobCache {
    durable: Arc<dyn VirtualFs>,
    local: Arc<dyn VirtualFs>,
    config: CacheConfig,
}

impl BlobCache {
    /// Creates a cache moving files between `local` and `durable`.
    pub fn new(durable: Arc<dyn VirtualFs>, local: Arc<dyn VirtualFs>) -> Self {
        Self {
            durable,
            local,
            config: CacheConfig::default(),
        }
    }

    /// Creates a cache with a fresh in-memory durable tier.
    pub fn in_memory(local: Arc<dyn VirtualFs>) -> Self {
        Self::new(Arc::new(InMemoryFs::new()), local)
    }

    /// Opens a cache whose durable tier is `<root>/<namespace>` on the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_directory(
        root: &Path,
        local: Arc<dyn VirtualFs>,
        config: CacheConfig,
    ) -> CacheResult<Self> {
        let durable = DirectoryFs::open(&root.join(&config.namespace))?;
        Ok(Self {
            durable: Arc::new(durable),
            local,
            config,
        })
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the durable filesystem.
    pub fn durable(&self) -> &Arc<dyn VirtualFs> {
        &self.durable
    }

    /// Returns the local filesystem.
    pub fn local(&self) -> &Arc<dyn VirtualFs> {
        &self.local
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for BlobCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExternalCache for BlobCache {
    async fn sync_into_local(&self, name: &str) -> CacheResult<SyncStatus> {
        let key = durable_key(name);
        if !self.durable.exists(&key)? {
            tracing::debug!(name, %key, "no durable copy to restore");
            return Ok(SyncStatus::MISSING);
        }

        let data = self.durable.read(&key)?;
        self.local.write(name, &data)?;
        tracing::debug!(name, %key, bytes = data.len(), "restored durable copy");
        Ok(SyncStatus::SUCCESS)
    }

    async fn push_from_local(&self, name: &str) -> CacheResult<SyncStatus> {
        if !self.local.exists(name)? {
            tracing::debug!(name, "nothing to push");
            return Ok(SyncStatus::MISSING);
        }

        pause(self.config.settle_delay).await;

        let key = durable_key(name);
        let data = self.local.read(name)?;
        self.durable.write(&key, &data)?;
        if self.config.remove_after_push {
            self.local.remove(name)?;
        }
        tracing::debug!(name, %key, bytes = data.len(), "pushed local file");
        Ok(SyncStatus::SUCCESS)
    }
}

fn durable_key(name: &str) -> String {
    let key = cache_key(name);
    let mut encoded = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '/' => encoded.push_str("%2F"),
            '\\' => encoded.push_str("%5C"),
            _ => encoded.push(c),
        }
    }
    encoded
}
