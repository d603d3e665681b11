//! Error types for cache operations.

use thiserror::Error;
use vfsdb_storage::StorageError;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while talking to the external cache.
///
/// An absent blob is not an error: it is reported as
/// [`crate::SyncStatus::MISSING`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// Local or durable storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cache could not be reached.
    #[error("cache unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },
}

impl CacheError {
    /// Creates a retryable unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable unavailable error.
    pub fn unavailable_fatal(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Unavailable { retryable, .. } => *retryable,
            CacheError::Storage(StorageError::Io(_)) => true,
            CacheError::Storage(_) => false,
        }
    }
}
