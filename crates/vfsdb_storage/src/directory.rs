//! Directory-backed virtual filesystem for native builds.

use crate::error::{StorageError, StorageResult};
use crate::vfs::{validate_name, VirtualFs};
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix for in-progress writes. Files carrying it are hidden from `list`.
const PARTIAL_SUFFIX: &str = ".partial";

/// A virtual filesystem stored as a flat directory on the host.
///
/// Each file name maps to one file directly under the root directory, so
/// names may not contain path separators. Writes go to a temporary sibling
/// that is renamed over the target, so readers never see a torn file.
///
/// # Thread Safety
///
/// This filesystem is thread-safe. Writes are serialized by an internal lock.
///
/// # Example
///
/// ```no_run
/// use vfsdb_storage::{DirectoryFs, VirtualFs};
/// use std::path::Path;
///
/// let fs = DirectoryFs::open(Path::new("vfs-root")).unwrap();
/// fs.write("app.db", b"persistent data").unwrap();
/// ```
#[derive(Debug)]
pub struct DirectoryFs {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectoryFs {
    /// Opens a filesystem rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        if name.contains(['/', '\\']) || name.ends_with(PARTIAL_SUFFIX) {
            return Err(StorageError::invalid_name(name));
        }
        Ok(self.root.join(name))
    }
}

fn not_found_as(name: &str, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::not_found(name)
    } else {
        StorageError::Io(err)
    }
}

impl VirtualFs for DirectoryFs {
    fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|e| not_found_as(name, e))
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(name)?;
        let partial = self.root.join(format!("{name}{PARTIAL_SUFFIX}"));

        let _guard = self.write_lock.lock();
        {
            let mut file = fs::File::create(&partial)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&partial, &path)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    fn remove(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn size(&self, name: &str) -> StorageResult<u64> {
        let path = self.path_for(name)?;
        let metadata = fs::metadata(&path).map_err(|e| not_found_as(name, e))?;
        Ok(metadata.len())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(PARTIAL_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn directory_create_new() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("vfs");

        let fs = DirectoryFs::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(fs.root(), root);
        assert!(fs.list().unwrap().is_empty());
    }

    #[test]
    fn directory_write_and_read() {
        let dir = tempdir().unwrap();
        let fs = DirectoryFs::open(dir.path()).unwrap();

        fs.write("app.db", b"hello world").unwrap();
        assert_eq!(fs.read("app.db").unwrap(), b"hello world");
        assert_eq!(fs.size("app.db").unwrap(), 11);
        assert!(fs.exists("app.db").unwrap());
    }

    #[test]
    fn directory_persistence() {
        let dir = tempdir().unwrap();

        {
            let fs = DirectoryFs::open(dir.path()).unwrap();
            fs.write("app.db", b"persistent data").unwrap();
        }

        {
            let fs = DirectoryFs::open(dir.path()).unwrap();
            assert_eq!(fs.read("app.db").unwrap(), b"persistent data");
        }
    }

    #[test]
    fn directory_missing_file() {
        let dir = tempdir().unwrap();
        let fs = DirectoryFs::open(dir.path()).unwrap();

        assert!(matches!(
            fs.read("missing.db"),
            Err(StorageError::NotFound { .. })
        ));
        assert!(!fs.exists("missing.db").unwrap());
        assert!(!fs.remove("missing.db").unwrap());
    }

    #[test]
    fn directory_rejects_separators() {
        let dir = tempdir().unwrap();
        let fs = DirectoryFs::open(dir.path()).unwrap();

        assert!(matches!(
            fs.write("sub/app.db", b"x"),
            Err(StorageError::InvalidName { .. })
        ));
        assert!(matches!(
            fs.write("app.db.partial", b"x"),
            Err(StorageError::InvalidName { .. })
        ));
    }

    #[test]
    fn directory_copy_and_list() {
        let dir = tempdir().unwrap();
        let fs = DirectoryFs::open(dir.path()).unwrap();

        fs.write("app.db", b"payload").unwrap();
        fs.copy("app.db", "app.db_bak").unwrap();

        assert_eq!(fs.list().unwrap(), vec!["app.db", "app.db_bak"]);
        assert_eq!(fs.read("app.db_bak").unwrap(), b"payload");

        assert!(fs.remove("app.db").unwrap());
        assert_eq!(fs.list().unwrap(), vec!["app.db_bak"]);
    }
}
