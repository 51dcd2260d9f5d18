//! Persistence port consumed by the core.
//!
//! ```text
//! UserStore (trait)            - user reads, registration, conditional update, top-N
//!     └── SqliteUserStore      - SQLite implementation (worksession-store)
//!     └── MemoryUserStore      - In-memory implementation for tests and simulation
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::user::{User, UserId};

/// Operations the core needs from the user persistence layer.
pub trait UserStore: Send + Sync {
    /// Fetch a user by unique username.
    fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Fetch a user by id.
    fn get_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Register a new user with score 0 and version `now`.
    ///
    /// Fails with `InvalidArgument` if the username is taken.
    fn insert_user(&self, username: &str, now: i64) -> Result<User>;

    /// Write `username`, `score` and `updated = now` for `id`, but only if the
    /// stored `updated` still equals `expected_updated`.
    ///
    /// Returns whether a row changed. `false` leaves the row untouched.
    fn update_optimistic(
        &self,
        id: UserId,
        username: &str,
        score: i64,
        expected_updated: i64,
        now: i64,
    ) -> Result<bool>;

    /// Up to `n` users ordered by score descending, ties by username.
    fn top_by_score(&self, n: usize) -> Result<Vec<User>>;
}

impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        (**self).get_by_username(username)
    }

    fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        (**self).get_by_id(id)
    }

    fn insert_user(&self, username: &str, now: i64) -> Result<User> {
        (**self).insert_user(username, now)
    }

    fn update_optimistic(
        &self,
        id: UserId,
        username: &str,
        score: i64,
        expected_updated: i64,
        now: i64,
    ) -> Result<bool> {
        (**self).update_optimistic(id, username, score, expected_updated, now)
    }

    fn top_by_score(&self, n: usize) -> Result<Vec<User>> {
        (**self).top_by_score(n)
    }
}

impl<T: UserStore + ?Sized> UserStore for &T {
    fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        (**self).get_by_username(username)
    }

    fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        (**self).get_by_id(id)
    }

    fn insert_user(&self, username: &str, now: i64) -> Result<User> {
        (**self).insert_user(username, now)
    }

    fn update_optimistic(
        &self,
        id: UserId,
        username: &str,
        score: i64,
        expected_updated: i64,
        now: i64,
    ) -> Result<bool> {
        (**self).update_optimistic(id, username, score, expected_updated, now)
    }

    fn top_by_score(&self, n: usize) -> Result<Vec<User>> {
        (**self).top_by_score(n)
    }
}

#[derive(Debug, Default)]
struct MemoryUsers {
    by_id: HashMap<UserId, User>,
    next_id: UserId,
}

/// In-memory [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<MemoryUsers>,
}

impl MemoryUserStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStore for MemoryUserStore {
    fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read();
        Ok(inner
            .by_id
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.inner.read().by_id.get(&id).cloned())
    }

    fn insert_user(&self, username: &str, now: i64) -> Result<User> {
        let mut inner = self.inner.write();
        if inner.by_id.values().any(|u| u.username == username) {
            return Err(Error::InvalidArgument(format!(
                "username '{}' is already registered",
                username
            )));
        }
        inner.next_id += 1;
        let user = User::new(inner.next_id, username, 0, now);
        inner.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_optimistic(
        &self,
        id: UserId,
        username: &str,
        score: i64,
        expected_updated: i64,
        now: i64,
    ) -> Result<bool> {
        let mut inner = self.inner.write();
        // Version first, like `WHERE id = ? AND updated = ?`.
        match inner.by_id.get(&id) {
            Some(user) if user.updated == expected_updated => {}
            _ => return Ok(false),
        }
        if inner
            .by_id
            .values()
            .any(|u| u.id != id && u.username == username)
        {
            return Err(Error::InvalidArgument(format!(
                "username '{}' is already registered",
                username
            )));
        }
        let Some(user) = inner.by_id.get_mut(&id) else {
            return Ok(false);
        };
        user.username = username.to_string();
        user.score = score;
        user.updated = now;
        Ok(true)
    }

    fn top_by_score(&self, n: usize) -> Result<Vec<User>> {
        let inner = self.inner.read();
        let mut users: Vec<User> = inner.by_id.values().cloned().collect();
        users.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));
        users.truncate(n);
        Ok(users)
    }
}
