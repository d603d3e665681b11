//! Factory configuration.

use crate::filename::DEFAULT_FILENAME;
use std::time::Duration;

/// Configuration for a [`crate::PersistentContextFactory`].
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Filename used when the connection string names no file.
    pub default_filename: String,

    /// Upper bound for each external cache call (`None` = wait forever).
    ///
    /// Only enforced while a Tokio runtime is available.
    pub cache_timeout: Option<Duration>,

    /// Whether the first context created asks the engine to create the schema.
    pub ensure_created: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            default_filename: DEFAULT_FILENAME.to_string(),
            cache_timeout: None,
            ensure_created: true,
        }
    }
}

impl FactoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback filename.
    #[must_use]
    pub fn default_filename(mut self, name: impl Into<String>) -> Self {
        self.default_filename = name.into();
        self
    }

    /// Sets the timeout for external cache calls.
    #[must_use]
    pub const fn cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = Some(timeout);
        self
    }

    /// Sets whether schema creation runs on first use.
    #[must_use]
    pub const fn ensure_created(mut self, value: bool) -> Self {
        self.ensure_created = value;
        self
    }
}
