//! In-memory virtual filesystem.

use crate::error::{StorageError, StorageResult};
use crate::vfs::{validate_name, VirtualFs};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory virtual filesystem.
///
/// This models the sandbox's ephemeral filesystem: everything lives in
/// process memory and disappears with it. It is also the filesystem used by
/// unit and integration tests.
///
/// # Thread Safety
///
/// This filesystem is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use vfsdb_storage::{InMemoryFs, VirtualFs};
///
/// let fs = InMemoryFs::new();
/// fs.write("app.db", b"test data").unwrap();
/// assert_eq!(fs.size("app.db").unwrap(), 9);
/// assert!(fs.exists("app.db").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryFs {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryFs {
    /// Creates a new empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filesystem with pre-existing files.
    ///
    /// Useful for testing restore scenarios.
    #[must_use]
    pub fn with_files<N, D>(files: impl IntoIterator<Item = (N, D)>) -> Self
    where
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let files = files
            .into_iter()
            .map(|(name, data)| (name.into(), data.into()))
            .collect();
        Self {
            files: RwLock::new(files),
        }
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Returns true if there are no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Removes every file.
    pub fn clear(&self) {
        self.files.write().clear();
    }
}

impl VirtualFs for InMemoryFs {
    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        self.files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        self.files.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.files.read().contains_key(name))
    }

    fn remove(&self, name: &str) -> StorageResult<bool> {
        Ok(self.files.write().remove(name).is_some())
    }

    fn size(&self, name: &str) -> StorageResult<u64> {
        self.files
            .read()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::not_found(name))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }

    fn copy(&self, source: &str, target: &str) -> StorageResult<u64> {
        validate_name(target)?;
        let mut files = self.files.write();
        let data = files
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::not_found(source))?;
        let len = data.len() as u64;
        files.insert(target.to_string(), data);
        Ok(len)
    }
}
