use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;
use worksession_core::{User, UserId, UserStore};

use crate::{Result, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT    NOT NULL UNIQUE,
    score    INTEGER NOT NULL DEFAULT 0,
    updated  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_score ON users (score DESC, username ASC);
";

/// Thin repository over SQLite for user records.
///
/// Thread-safe via internal `Mutex<Connection>`.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ── User CRUD ───────────────────────────────────────────────────

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, username, score, updated FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?)
    }

    pub fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, username, score, updated FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?)
    }

    pub fn register(&self, username: &str, now: i64) -> Result<User> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (username, score, updated) VALUES (?1, 0, ?2)",
            params![username, now],
        )
        .map_err(|e| unique_violation(e, username))?;
        let id = conn.last_insert_rowid();
        debug!(user_id = id, username = %username, "User registered");
        Ok(User::new(id, username, 0, now))
    }

    /// Conditional write; returns the number of rows changed (0 or 1).
    pub fn update_if_version(
        &self,
        id: UserId,
        username: &str,
        score: i64,
        expected_updated: i64,
        now: i64,
    ) -> Result<usize> {
        let changed = self
            .conn()
            .execute(
                "UPDATE users SET username = ?1, score = ?2, updated = ?3
                 WHERE id = ?4 AND updated = ?5",
                params![username, score, now, id, expected_updated],
            )
            .map_err(|e| unique_violation(e, username))?;
        Ok(changed)
    }

    pub fn top(&self, n: usize) -> Result<Vec<User>> {
        let limit = i64::try_from(n)
            .map_err(|_| StoreError::OutOfRange(format!("ranking length {}", n)))?;
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, score, updated FROM users
             ORDER BY score DESC, username ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_user)?;
        let mut users = Vec::new();
        for r in rows {
            users.push(r?);
        }
        Ok(users)
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        score: row.get(2)?,
        updated: row.get(3)?,
    })
}

fn unique_violation(e: rusqlite::Error, username: &str) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::DuplicateUsername(username.to_string())
        }
        _ => StoreError::Database(e),
    }
}

impl UserStore for SqliteUserStore {
    fn get_by_username(&self, username: &str) -> worksession_core::Result<Option<User>> {
        Ok(self.find_by_username(username)?)
    }

    fn get_by_id(&self, id: UserId) -> worksession_core::Result<Option<User>> {
        Ok(self.find_by_id(id)?)
    }

    fn insert_user(&self, username: &str, now: i64) -> worksession_core::Result<User> {
        Ok(self.register(username, now)?)
    }

    fn update_optimistic(
        &self,
        id: UserId,
        username: &str,
        score: i64,
        expected_updated: i64,
        now: i64,
    ) -> worksession_core::Result<bool> {
        Ok(self.update_if_version(id, username, score, expected_updated, now)? == 1)
    }

    fn top_by_score(&self, n: usize) -> worksession_core::Result<Vec<User>> {
        Ok(self.top(n)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteUserStore {
        SqliteUserStore::open_in_memory().expect("failed to open in-memory store")
    }

    #[test]
    fn test_register_and_find() {
        let store = test_store();
        let alice = store.register("alice", 10).unwrap();

        assert_eq!(store.find_by_username("alice").unwrap(), Some(alice.clone()));
        assert_eq!(store.find_by_id(alice.id).unwrap(), Some(alice));
        assert_eq!(store.find_by_username("bob").unwrap(), None);
    }

    #[test]
    fn test_duplicate_username() {
        let store = test_store();
        store.register("alice", 0).unwrap();
        assert!(matches!(
            store.register("alice", 1),
            Err(StoreError::DuplicateUsername(_))
        ));
    }

    #[test]
    fn test_conditional_update() {
        let store = test_store();
        let alice = store.register("alice", 10).unwrap();

        assert_eq!(store.update_if_version(alice.id, "alice", 7, 9, 20).unwrap(), 0);
        assert_eq!(store.find_by_id(alice.id).unwrap(), Some(alice.clone()));

        assert_eq!(store.update_if_version(alice.id, "alice", 7, 10, 20).unwrap(), 1);
        let stored = store.find_by_id(alice.id).unwrap().unwrap();
        assert_eq!((stored.score, stored.updated), (7, 20));
    }

    #[test]
    fn test_rename_onto_taken_username() {
        let store = test_store();
        store.register("alice", 0).unwrap();
        let bob = store.register("bob", 0).unwrap();

        assert!(matches!(
            store.update_if_version(bob.id, "alice", 1, 0, 1),
            Err(StoreError::DuplicateUsername(_))
        ));
    }

    #[test]
    fn test_top_orders_by_score_then_name() {
        let store = test_store();
        for (name, score) in [("carol", 5), ("alice", 9), ("bob", 5)] {
            let user = store.register(name, 0).unwrap();
            store.update_if_version(user.id, name, score, 0, 1).unwrap();
        }

        let names: Vec<String> = store.top(2).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(store.top(10).unwrap().len(), 3);
    }

    #[test]
    fn test_errors_convert_to_core_kinds() {
        let store = test_store();
        store.insert_user("alice", 0).unwrap();
        assert!(matches!(
            store.insert_user("alice", 0),
            Err(worksession_core::Error::InvalidArgument(_))
        ));
    }
}
