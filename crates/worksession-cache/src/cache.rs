//! Concurrent namespaced keyed cache.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use crate::config::{CacheConfig, CacheNamespace};

/// The contract every cache in this workspace offers.
///
/// Freshness is not part of the contract: `select` returns whatever was last
/// `put`, however old. See [`Expiring`](crate::Expiring).
pub trait KeyedCache<K, V>: Send + Sync {
    /// Look up the value stored under `key`.
    fn select(&self, key: &K) -> Option<V>;

    /// Insert or overwrite the value stored under `key`.
    fn put(&self, key: K, value: V);

    /// Whether anything is stored under `key`.
    fn contains(&self, key: &K) -> bool;
}

/// A key qualified by the namespace of the cache that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey<K> {
    pub namespace: CacheNamespace,
    pub key: K,
}

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,

    /// Monotonic insertion sequence within the owning storage.
    pub sequence: u64,
}

/// Backing storage, shareable between caches with distinct namespaces.
///
/// Sharded, so operations on different keys do not contend on a single lock.
/// A write replaces a whole entry under the shard lock; readers see either
/// the previous entry or the new one, never a mix.
pub struct CacheStorage<K, V> {
    entries: DashMap<NamespacedKey<K>, CacheEntry<V>>,
    sequence: AtomicU64,
}

impl<K, V> CacheStorage<K, V>
where
    K: Eq + Hash,
{
    /// Create empty storage with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            sequence: AtomicU64::new(0),
        }
    }

    /// Total entries across every namespace.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-memory [`KeyedCache`] bound to a single namespace.
///
/// Cloning yields another handle to the same storage and namespace.
pub struct MemoryCache<K, V> {
    storage: Arc<CacheStorage<K, V>>,
    config: CacheConfig,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with its own private storage.
    pub fn new(config: CacheConfig) -> Self {
        let storage = Arc::new(CacheStorage::with_capacity(config.initial_capacity));
        Self { storage, config }
    }

    /// Create a cache over storage that other namespaces may also use.
    pub fn with_storage(config: CacheConfig, storage: Arc<CacheStorage<K, V>>) -> Self {
        Self { storage, config }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn namespace(&self) -> &CacheNamespace {
        &self.config.namespace
    }

    /// The storage this cache writes into.
    pub fn storage(&self) -> &Arc<CacheStorage<K, V>> {
        &self.storage
    }

    fn qualify(&self, key: K) -> NamespacedKey<K> {
        NamespacedKey {
            namespace: self.config.namespace.clone(),
            key,
        }
    }

    /// Look up the full entry under `key`.
    pub fn select_entry(&self, key: &K) -> Option<CacheEntry<V>> {
        self.storage
            .entries
            .get(&self.qualify(key.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Return the value under `key`, inserting `make()` first if absent.
    ///
    /// The check and the insert happen under one shard lock, so concurrent
    /// callers racing on an unseen key all get the same value back and
    /// exactly one of them sees `true`.
    pub fn select_or_insert_with<F>(&self, key: K, make: F) -> (V, bool)
    where
        F: FnOnce() -> V,
    {
        match self.storage.entries.entry(self.qualify(key)) {
            Entry::Occupied(occupied) => (occupied.get().value.clone(), false),
            Entry::Vacant(vacant) => {
                let sequence = self.storage.next_sequence();
                let value = make();
                vacant.insert(CacheEntry {
                    value: value.clone(),
                    sequence,
                });
                trace!(namespace = %self.config.namespace, sequence, "Cache entry created");
                (value, true)
            }
        }
    }

    /// Remove the entry under `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.storage
            .entries
            .remove(&self.qualify(key.clone()))
            .map(|(_, entry)| entry.value)
    }

    /// Number of entries in this namespace.
    pub fn len(&self) -> usize {
        self.storage
            .entries
            .iter()
            .filter(|entry| entry.key().namespace == self.config.namespace)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            namespace: self.config.namespace.clone(),
            size: self.len(),
            storage_size: self.storage.len(),
        }
    }
}

impl<K, V> KeyedCache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn select(&self, key: &K) -> Option<V> {
        let value = self.select_entry(key).map(|entry| entry.value);
        trace!(namespace = %self.config.namespace, hit = value.is_some(), "Cache select");
        value
    }

    fn put(&self, key: K, value: V) {
        let sequence = self.storage.next_sequence();
        self.storage
            .entries
            .insert(self.qualify(key), CacheEntry { value, sequence });
        trace!(namespace = %self.config.namespace, sequence, "Cache put");
    }

    fn contains(&self, key: &K) -> bool {
        self.storage.entries.contains_key(&self.qualify(key.clone()))
    }
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Namespace the numbers refer to.
    pub namespace: CacheNamespace,

    /// Entries in this namespace.
    pub size: usize,

    /// Entries in the backing storage across all namespaces.
    pub storage_size: usize,
}
