//! Error types for session, ranking and score operations.

use thiserror::Error;
use worksession_config::error_codes;

use crate::session::{Operation, SessionStatus};
use crate::user::UserId;

/// Result type alias using the coordinator error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed input, such as a session code in the wrong format.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not legal for the session's current status.
    ///
    /// Also returned to the loser when two callers race on one transition.
    #[error("Session {code} is {status}, cannot {operation}")]
    InvalidState {
        code: String,
        status: SessionStatus,
        operation: Operation,
    },

    /// Unknown session code or user.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic update lost: the stored version moved since it was read.
    #[error("Update conflict for user {id}: version {expected} is stale")]
    Conflict { id: UserId, expected: i64 },

    /// The persistence collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Stable response code for this kind.
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidArgument(_) => error_codes::INVALID_ARGUMENT,
            Error::InvalidState { .. } => error_codes::INVALID_STATE,
            Error::NotFound(_) => error_codes::NOT_FOUND,
            Error::Conflict { .. } => error_codes::CONFLICT,
            Error::Storage(_) => error_codes::STORAGE,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}
