//! Swap utility: exposes one file's bytes under another name.

use crate::error::StorageResult;
use crate::vfs::VirtualFs;
use std::sync::Arc;

/// Makes the bytes stored under `source` available under `target`.
///
/// Used twice by the persistence layer: to install a restored backup as the
/// live database file, and to snapshot the live file into a backup artifact.
/// Implementations must be synchronous and deterministic. Whether `source`
/// survives is up to the implementation.
pub trait Swap: Send + Sync {
    /// Performs the swap.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` does not exist or the target cannot be
    /// written.
    fn swap(&self, source: &str, target: &str) -> StorageResult<()>;

    /// Drops a source that is no longer needed after a swap. The default
    /// keeps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn discard(&self, _name: &str) -> StorageResult<()> {
        Ok(())
    }
}

/// A [`Swap`] that copies within a [`VirtualFs`]. The source is kept.
#[derive(Clone)]
pub struct CopySwap {
    fs: Arc<dyn VirtualFs>,
}

impl CopySwap {
    /// Creates a swap over `fs`.
    pub fn new(fs: Arc<dyn VirtualFs>) -> Self {
        Self { fs }
    }
}

impl std::fmt::Debug for CopySwap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopySwap").finish_non_exhaustive()
    }
}

impl Swap for CopySwap {
    fn swap(&self, source: &str, target: &str) -> StorageResult<()> {
        let bytes = self.fs.copy(source, target)?;
        tracing::trace!(source, target, bytes, "swapped file");
        Ok(())
    }

    fn discard(&self, name: &str) -> StorageResult<()> {
        if self.fs.remove(name)? {
            tracing::trace!(name, "discarded file");
        }
        Ok(())
    }
}
