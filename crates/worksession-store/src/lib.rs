//! SQLite persistence for users.
//!
//! Implements the [`UserStore`](worksession_core::UserStore) port with a
//! single `users` table. The optimistic update is one conditional `UPDATE`,
//! so the version check and the write are atomic in the database.

pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::SqliteUserStore;
