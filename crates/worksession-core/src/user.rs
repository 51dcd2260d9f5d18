//! User records as seen by the core.

use serde::{Deserialize, Serialize};

/// Persistence identity of a user.
pub type UserId = i64;

/// A registered participant.
///
/// Owned by the persistence layer. `updated` is the logical version used by
/// optimistic updates, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub score: i64,
    pub updated: i64,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>, score: i64, updated: i64) -> Self {
        Self {
            id,
            username: username.into(),
            score,
            updated,
        }
    }
}
