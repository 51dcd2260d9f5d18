//! Optimistic-concurrency score updates.
//!
//! [`OptimisticScoreUpdater`] makes a single conditional attempt and reports a
//! lost race as [`Error::Conflict`]. [`ScoreKeeper`] is the caller-side loop:
//! it re-reads the row and tries again, a bounded number of times.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::UserStore;
use crate::user::{User, UserId};

/// Attempts [`ScoreKeeper`] makes before giving up on a contended row.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Applies conditional writes to a user's score.
pub struct OptimisticScoreUpdater<S: UserStore> {
    users: S,
}

impl<S: UserStore> OptimisticScoreUpdater<S> {
    pub fn new(users: S) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &S {
        &self.users
    }

    /// Write `new_username` and `new_score` for `id` if its stored version is
    /// still `expected_updated`, stamping the row with `now`.
    ///
    /// On `Conflict` nothing was written; the caller must re-read before
    /// trying again.
    pub fn update_optimistic(
        &self,
        id: UserId,
        new_username: &str,
        new_score: i64,
        expected_updated: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self.users.update_optimistic(
            id,
            new_username,
            new_score,
            expected_updated,
            now.timestamp_millis(),
        )?;
        if changed {
            debug!(user_id = id, score = new_score, "Optimistic update applied");
            Ok(())
        } else {
            debug!(user_id = id, expected = expected_updated, "Optimistic update rejected");
            Err(Error::Conflict {
                id,
                expected: expected_updated,
            })
        }
    }
}

/// Read-modify-write loop over [`OptimisticScoreUpdater`].
pub struct ScoreKeeper<S: UserStore> {
    updater: OptimisticScoreUpdater<S>,
    clock: Arc<dyn Clock>,
    max_attempts: usize,
}

impl<S: UserStore> ScoreKeeper<S> {
    pub fn new(users: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            updater: OptimisticScoreUpdater::new(users),
            clock,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the attempt bound (at least one attempt is always made).
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Add `delta` to `username`'s score and return the stored result.
    ///
    /// Surfaces the last `Conflict` once the attempts are used up.
    pub fn add_score(&self, username: &str, delta: i64) -> Result<User> {
        let mut last_conflict = None;
        for attempt in 1..=self.max_attempts {
            let user = self
                .updater
                .users()
                .get_by_username(username)?
                .ok_or_else(|| Error::NotFound(format!("user {}", username)))?;

            // Versions must strictly increase or a writer that read the old
            // stamp within the same millisecond could still match.
            let now = self.clock.now();
            let stamp = now.timestamp_millis().max(user.updated + 1);
            let now = DateTime::<Utc>::from_timestamp_millis(stamp).unwrap_or(now);
            let score = user.score.saturating_add(delta);

            match self
                .updater
                .update_optimistic(user.id, &user.username, score, user.updated, now)
            {
                Ok(()) => {
                    return Ok(User {
                        score,
                        updated: now.timestamp_millis(),
                        ..user
                    });
                }
                Err(err) if err.is_conflict() => {
                    debug!(user = %username, attempt, "Score update conflicted, re-reading");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            user = %username,
            attempts = self.max_attempts,
            "Score update gave up after conflicts"
        );
        Err(last_conflict.unwrap_or_else(|| Error::Conflict {
            id: 0,
            expected: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use parking_lot::Mutex;

    use crate::clock::ManualClock;
    use crate::store::MemoryUserStore;

    #[test]
    fn test_update_succeeds_on_matching_version() {
        let store = MemoryUserStore::new();
        let alice = store.insert_user("alice", 5).unwrap();
        let updater = OptimisticScoreUpdater::new(&store);
        let now = DateTime::<Utc>::from_timestamp_millis(9).unwrap();

        updater
            .update_optimistic(alice.id, "alice", 40, 5, now)
            .unwrap();

        let stored = store.get_by_id(alice.id).unwrap().unwrap();
        assert_eq!((stored.score, stored.updated), (40, 9));
    }

    #[test]
    fn test_update_conflict_leaves_row_unchanged() {
        let store = MemoryUserStore::new();
        let alice = store.insert_user("alice", 5).unwrap();
        let updater = OptimisticScoreUpdater::new(&store);
        let now = DateTime::<Utc>::from_timestamp_millis(9).unwrap();

        let err = updater
            .update_optimistic(alice.id, "renamed", 40, 4, now)
            .unwrap_err();

        assert_eq!(err, Error::Conflict { id: alice.id, expected: 4 });
        assert_eq!(store.get_by_id(alice.id).unwrap(), Some(alice));
    }

    #[test]
    fn test_stale_rename_onto_taken_name_is_conflict() {
        let store = MemoryUserStore::new();
        store.insert_user("alice", 0).unwrap();
        let bob = store.insert_user("bob", 5).unwrap();
        let updater = OptimisticScoreUpdater::new(&store);
        let now = DateTime::<Utc>::from_timestamp_millis(9).unwrap();

        let err = updater
            .update_optimistic(bob.id, "alice", 1, 99, now)
            .unwrap_err();

        assert_eq!(err, Error::Conflict { id: bob.id, expected: 99 });
    }

    /// Lets a competing write land between the keeper's read and its write.
    struct Interfering {
        inner: MemoryUserStore,
        remaining: Mutex<usize>,
    }

    impl UserStore for Interfering {
        fn get_by_username(&self, username: &str) -> Result<Option<User>> {
            let user = self.inner.get_by_username(username)?;
            let mut remaining = self.remaining.lock();
            if *remaining > 0
                && let Some(u) = &user
            {
                *remaining -= 1;
                self.inner
                    .update_optimistic(u.id, &u.username, u.score + 100, u.updated, u.updated + 1)?;
            }
            Ok(user)
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
            self.inner.top_by_score(n)
        }
    }

    fn interfering(times: usize) -> Interfering {
        let store = Interfering {
            inner: MemoryUserStore::new(),
            remaining: Mutex::new(times),
        };
        store.insert_user("alice", 0).unwrap();
        store
    }

    #[test]
    fn test_keeper_retries_after_conflict() {
        let store = interfering(2);
        let keeper = ScoreKeeper::new(&store, Arc::new(ManualClock::default()));

        let user = keeper.add_score("alice", 1).unwrap();

        assert_eq!(user.score, 201);
        assert_eq!(store.inner.get_by_username("alice").unwrap(), Some(user));
    }

    #[test]
    fn test_keeper_gives_up_after_max_attempts() {
        let store = interfering(5);
        let keeper =
            ScoreKeeper::new(&store, Arc::new(ManualClock::default())).with_max_attempts(2);

        let err = keeper.add_score("alice", 1).unwrap_err();

        assert!(err.is_conflict());
        // Only the interfering writes landed.
        let stored = store.inner.get_by_username("alice").unwrap().unwrap();
        assert_eq!(stored.score, 200);
    }

    #[test]
    fn test_keeper_unknown_user() {
        let store = MemoryUserStore::new();
        let keeper = ScoreKeeper::new(&store, Arc::new(ManualClock::default()));
        assert!(matches!(keeper.add_score("ghost", 1), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_concurrent_keepers_lose_no_updates() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert_user("alice", 0).unwrap();
        // A frozen clock makes every writer pick the same wall time.
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let keeper = ScoreKeeper::new(Arc::clone(&store), Arc::clone(&clock))
                    .with_max_attempts(1000);
                thread::spawn(move || {
                    for _ in 0..25 {
                        keeper.add_score("alice", 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let alice = store.get_by_username("alice").unwrap().unwrap();
        assert_eq!(alice.score, 100);
        assert_eq!(alice.updated, 100);
    }
}
