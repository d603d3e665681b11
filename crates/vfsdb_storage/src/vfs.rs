//! Virtual filesystem trait definition.

use crate::error::{StorageError, StorageResult};

/// A flat, named-blob filesystem.
///
/// This is the sandbox's view of "disk": the engine keeps its live database
/// file here, the external cache restores backups into it and reads backup
/// artifacts from it, and the swap utility copies between names inside it.
///
/// # Invariants
///
/// - `write` replaces the whole file; a later `read` returns exactly those bytes
/// - `read`, `size` and `copy` fail with [`StorageError::NotFound`] for absent files
/// - `remove` of an absent file is not an error
/// - Implementations must be `Send + Sync`; every method takes `&self`
///
/// # Implementors
///
/// - [`super::InMemoryFs`] - Ephemeral, in-process
/// - [`super::DirectoryFs`] - Backed by a host directory
pub trait VirtualFs: Send + Sync {
    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist, or an
    /// I/O error.
    fn read(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Creates or replaces the file with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Returns true if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Removes the file. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn remove(&self, name: &str) -> StorageResult<bool>;

    /// Returns the size of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist.
    fn size(&self, name: &str) -> StorageResult<u64>;

    /// Lists all file names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Copies `source` to `target`, replacing `target`. Returns the number of
    /// bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `source` does not exist.
    fn copy(&self, source: &str, target: &str) -> StorageResult<u64> {
        let data = self.read(source)?;
        self.write(target, &data)?;
        Ok(data.len() as u64)
    }
}

/// Checks that `name` can be used as a file name.
///
/// Rejects empty names, names containing NUL, and the `.`/`..` components.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] for rejected names.
pub fn validate_name(name: &str) -> StorageResult<()> {
    let bad = name.is_empty()
        || name.contains('\0')
        || name
            .split(['/', '\\'])
            .any(|component| component == "." || component == "..");
    if bad {
        return Err(StorageError::invalid_name(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_name("app.db").is_ok());
        assert!(validate_name("app.db_bak-1a2b3c4d").is_ok());
        assert!(validate_name("data/app.db").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../escape.db").is_err());
        assert!(validate_name("a\0b").is_err());
    }

    proptest! {
        #[test]
        fn alphanumeric_names_are_valid(name in "[a-zA-Z0-9_.-]{1,32}") {
            prop_assume!(name != "." && name != "..");
            prop_assert!(validate_name(&name).is_ok());
        }
    }
}
