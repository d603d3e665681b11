//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named file does not exist.
    #[error("file not found: {name}")]
    NotFound {
        /// The requested file name.
        name: String,
    },

    /// The file name cannot be used in this filesystem.
    #[error("invalid file name: {name:?}")]
    InvalidName {
        /// The rejected file name.
        name: String,
    },
}

impl StorageError {
    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Returns true if this error means the file is absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound { .. } => true,
            StorageError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            StorageError::InvalidName { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_detection() {
        assert!(StorageError::not_found("app.db").is_not_found());
        assert!(StorageError::Io(io::Error::from(io::ErrorKind::NotFound)).is_not_found());
        assert!(!StorageError::invalid_name("..").is_not_found());
    }

    #[test]
    fn error_display() {
        let err = StorageError::not_found("app.db");
        assert_eq!(err.to_string(), "file not found: app.db");
    }
}
