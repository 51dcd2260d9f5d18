//! Leaderboard read path with a lazily refreshed memo.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};
use worksession_cache::{CacheConfig, Expiring, KeyedCache, MemoryCache};
use worksession_config::RankingConfig;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::UserStore;

/// Namespace of the ranking memo.
pub const RANKING_NAMESPACE: &str = "ranking";

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub username: String,
    pub score: i64,
}

/// Top-N leaderboard as of `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingSnapshot {
    pub entries: Vec<RankEntry>,
    pub generated_at: DateTime<Utc>,
}

impl Expiring for RankingSnapshot {
    fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

/// Memoizes leaderboard snapshots keyed by requested length.
///
/// Staleness is checked only when a length is read again; nothing is expired
/// in the background.
pub struct RankingCache<S: UserStore> {
    cache: MemoryCache<usize, Arc<RankingSnapshot>>,
    users: S,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_top: usize,
}

impl<S: UserStore> RankingCache<S> {
    pub fn new(config: &RankingConfig, users: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: MemoryCache::new(CacheConfig::new(RANKING_NAMESPACE)),
            users,
            clock,
            ttl: config.cache_ttl(),
            max_top: config.max_top,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn check_len(&self, n: usize) -> Result<()> {
        if n == 0 || n > self.max_top {
            return Err(Error::InvalidArgument(format!(
                "ranking length must be between 1 and {}, got {}",
                self.max_top, n
            )));
        }
        Ok(())
    }

    fn query(&self, n: usize) -> Result<Arc<RankingSnapshot>> {
        let entries = self
            .users
            .top_by_score(n)?
            .into_iter()
            .take(n)
            .map(|u| RankEntry {
                username: u.username,
                score: u.score,
            })
            .collect();
        Ok(Arc::new(RankingSnapshot {
            entries,
            generated_at: self.clock.now(),
        }))
    }

    /// Top `n`, served from the memo while it is younger than the TTL.
    pub fn get_rankings(&self, n: usize) -> Result<Arc<RankingSnapshot>> {
        self.check_len(n)?;
        let now = self.clock.now();
        if let Some(cached) = self.cache.select(&n) {
            if !cached.is_expired(now, self.ttl) {
                trace!(top = n, "Ranking cache hit");
                return Ok(cached);
            }
            debug!(top = n, generated_at = %cached.generated_at, "Ranking snapshot stale");
        }

        let fresh = self.query(n)?;
        self.cache.put(n, Arc::clone(&fresh));
        debug!(top = n, rows = fresh.entries.len(), "Ranking snapshot recomputed");
        Ok(fresh)
    }

    /// Top `n` straight from storage. Never touches the memo.
    pub fn get_latest_rankings(&self, n: usize) -> Result<Arc<RankingSnapshot>> {
        self.check_len(n)?;
        self.query(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::clock::ManualClock;
    use crate::store::MemoryUserStore;
    use crate::user::{User, UserId};

    /// Counts top-N queries reaching the store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryUserStore,
        queries: AtomicUsize,
    }

    impl UserStore for CountingStore {
        fn get_by_username(&self, username: &str) -> Result<Option<User>> {
            self.inner.get_by_username(username)
        }

        fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
            self.inner.get_by_id(id)
        }

        fn insert_user(&self, username: &str, now: i64) -> Result<User> {
            self.inner.insert_user(username, now)
        }

        fn update_optimistic(
            &self,
            id: UserId,
            username: &str,
            score: i64,
            expected_updated: i64,
            now: i64,
        ) -> Result<bool> {
            self.inner
                .update_optimistic(id, username, score, expected_updated, now)
        }

        fn top_by_score(&self, n: usize) -> Result<Vec<User>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.top_by_score(n)
        }
    }

    fn setup() -> (RankingCache<Arc<CountingStore>>, Arc<CountingStore>, Arc<ManualClock>) {
        let store = Arc::new(CountingStore::default());
        for (name, score) in [("alice", 30), ("bob", 20), ("carol", 10)] {
            let user = store.insert_user(name, 0).unwrap();
            store.update_optimistic(user.id, name, score, 0, 1).unwrap();
        }
        let clock = Arc::new(ManualClock::default());
        let config = RankingConfig {
            cache_ttl_secs: 60,
            max_top: 10,
        };
        let rankings = RankingCache::new(&config, Arc::clone(&store), clock.clone());
        (rankings, store, clock)
    }

    #[test]
    fn test_cached_within_ttl() {
        let (rankings, store, clock) = setup();

        let first = rankings.get_rankings(5).unwrap();
        clock.advance(Duration::from_secs(10));
        let second = rankings.get_rankings(5).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
        assert_eq!(first.entries.len(), 3);
        assert_eq!(first.entries[0].username, "alice");
    }

    #[test]
    fn test_recomputed_once_after_ttl() {
        let (rankings, store, clock) = setup();

        let first = rankings.get_rankings(2).unwrap();
        clock.advance(Duration::from_secs(60));
        let second = rankings.get_rankings(2).unwrap();
        let third = rankings.get_rankings(2).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
        assert_eq!(second.generated_at, clock.now());
    }

    #[test]
    fn test_lengths_cached_independently() {
        let (rankings, store, _clock) = setup();

        let two = rankings.get_rankings(2).unwrap();
        let three = rankings.get_rankings(3).unwrap();

        assert_eq!(two.entries.len(), 2);
        assert_eq!(three.entries.len(), 3);
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_latest_bypasses_and_does_not_populate() {
        let (rankings, store, clock) = setup();

        let cached = rankings.get_rankings(3).unwrap();
        let user = store.get_by_username("carol").unwrap().unwrap();
        store
            .update_optimistic(user.id, "carol", 99, user.updated, 2)
            .unwrap();
        clock.advance(Duration::from_secs(1));

        let latest = rankings.get_latest_rankings(3).unwrap();
        assert_eq!(latest.entries[0].username, "carol");

        let again = rankings.get_rankings(3).unwrap();
        assert!(Arc::ptr_eq(&cached, &again));
        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_latest_on_cold_cache_leaves_it_cold() {
        let (rankings, store, _clock) = setup();

        rankings.get_latest_rankings(3).unwrap();
        rankings.get_rankings(3).unwrap();

        assert_eq!(store.queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_length_bounds() {
        let (rankings, _store, _clock) = setup();
        assert!(matches!(rankings.get_rankings(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(rankings.get_rankings(11), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            rankings.get_latest_rankings(0),
            Err(Error::InvalidArgument(_))
        ));
    }
}
