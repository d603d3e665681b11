//! Error types for vfsdb core.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in vfsdb core operations.
///
/// Cache and backup failures are not errors at this level: they are folded
/// into a [`vfsdb_cache::SyncStatus`] and logged. What reaches a caller is
/// what the engine raised.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Virtual filesystem error.
    #[error("storage error: {0}")]
    Storage(#[from] vfsdb_storage::StorageError),

    /// Database image could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// Invalid database format or version.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// The database file has not been created.
    #[error("database not created: {filename}")]
    DatabaseNotCreated {
        /// The live database file.
        filename: String,
    },

    /// The table is not part of the schema.
    #[error("no such table: {table}")]
    SchemaMissing {
        /// Name of the table.
        table: String,
    },

    /// A row with this key already exists.
    #[error("duplicate key {key:?} in table {table}")]
    DuplicateKey {
        /// Name of the table.
        table: String,
        /// The conflicting key.
        key: String,
    },

    /// Entity not found.
    #[error("entity not found: {key:?} in table {table}")]
    EntityNotFound {
        /// Name of the table.
        table: String,
        /// The key that was not found.
        key: String,
    },

    /// Error raised by a third-party engine.
    #[error("engine error: {0}")]
    Engine(#[source] Box<dyn StdError + Send + Sync>),
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a missing table error.
    pub fn schema_missing(table: impl Into<String>) -> Self {
        Self::SchemaMissing {
            table: table.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Creates an entity not found error.
    pub fn entity_not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::EntityNotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Wraps an error raised by a third-party engine.
    pub fn engine(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Engine(Box::new(err))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::duplicate_key("people", "1");
        assert_eq!(err.to_string(), "duplicate key \"1\" in table people");

        let err = CoreError::ChecksumMismatch {
            expected: 0xdead_beef,
            actual: 1,
        };
        assert_eq!(err.to_string(), "checksum mismatch: expected deadbeef, got 00000001");
    }

    #[test]
    fn engine_error_keeps_source() {
        let io = std::io::Error::other("disk gone");
        let err = CoreError::engine(io);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "engine error: disk gone");
    }
}
