//! Configuration for a cache instance.

use std::fmt;
use std::sync::Arc;

/// Default number of entries to pre-allocate for a fresh storage.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Partition identifier for one logical use of a cache.
///
/// Two caches that share a [`CacheStorage`](crate::CacheStorage) never see
/// each other's entries as long as their namespaces differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheNamespace(Arc<str>);

impl CacheNamespace {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheNamespace {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Configuration for a cache instance.
///
/// Fixed at construction; a [`MemoryCache`](crate::MemoryCache) exposes it
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Partition this instance reads and writes.
    pub namespace: CacheNamespace,

    /// Capacity hint for storage created by this config.
    pub initial_capacity: usize,
}

impl CacheConfig {
    /// Create a configuration for the given namespace.
    pub fn new(namespace: impl Into<CacheNamespace>) -> Self {
        Self {
            namespace: namespace.into(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}
