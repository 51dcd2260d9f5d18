//! Namespaced keyed cache shared by the session registry and the ranking memo.
//!
//! This crate provides:
//! - A [`KeyedCache`] contract (`select` / `put` / `contains`)
//! - [`MemoryCache`], a sharded concurrent implementation
//! - Immutable per-instance namespaces so several caches can share storage
//! - The [`Expiring`] trait for values that judge their own freshness
//!
//! The cache never expires anything on its own. A caller that wants TTL
//! semantics reads the value and asks it whether it is stale.
//!
//! # Example
//!
//! ```rust,ignore
//! use worksession_cache::{CacheConfig, KeyedCache, MemoryCache};
//!
//! let cache: MemoryCache<String, u32> = MemoryCache::new(CacheConfig::new("session"));
//! cache.put("123456".to_string(), 7);
//! assert!(cache.contains(&"123456".to_string()));
//! ```

mod cache;
mod config;
mod freshness;

pub use cache::{CacheEntry, CacheStats, CacheStorage, KeyedCache, MemoryCache, NamespacedKey};
pub use config::{CacheConfig, CacheNamespace, DEFAULT_INITIAL_CAPACITY};
pub use freshness::Expiring;
