//! Configuration for cache implementations.

use std::time::Duration;

/// Configuration for a [`crate::BlobCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Namespace for durable blobs. Directory caches store blobs in a
    /// subdirectory of this name.
    pub namespace: String,
    /// Whether to delete the local artifact after a successful push.
    pub remove_after_push: bool,
    /// Pause before reading a local artifact for a push, giving the engine's
    /// file writes time to settle.
    pub settle_delay: Duration,
}

impl CacheConfig {
    /// Creates a configuration with the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Sets whether pushed artifacts are removed locally.
    #[must_use]
    pub fn with_remove_after_push(mut self, value: bool) -> Self {
        self.remove_after_push = value;
        self
    }

    /// Sets the settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "vfsdb".to_string(),
            remove_after_push: true,
            settle_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.namespace, "vfsdb");
        assert!(config.remove_after_push);
        assert_eq!(config.settle_delay, Duration::ZERO);
    }

    #[test]
    fn builder_pattern() {
        let config = CacheConfig::new("things")
            .with_remove_after_push(false)
            .with_settle_delay(Duration::from_millis(10));

        assert_eq!(config.namespace, "things");
        assert!(!config.remove_after_push);
        assert_eq!(config.settle_delay, Duration::from_millis(10));
    }
}
