//! Success/failure envelope handed to the request layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use worksession_config::ErrorMessages;

use crate::error::Error;

/// Envelope around an operation's outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    /// Milliseconds since the Unix epoch when the envelope was built.
    pub timestamp: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> Response<T> {
    fn build(
        now: DateTime<Utc>,
        success: bool,
        code: Option<u32>,
        message: Option<String>,
        payload: Option<T>,
    ) -> Self {
        Self {
            timestamp: now.timestamp_millis(),
            success,
            code,
            message,
            payload,
        }
    }

    pub fn success(payload: T, now: DateTime<Utc>) -> Self {
        Self::build(now, true, None, None, Some(payload))
    }

    /// Failure carrying `code` and its message from the table, if any.
    pub fn fail(code: u32, messages: &ErrorMessages, now: DateTime<Utc>) -> Self {
        let message = messages.message_for(code).map(str::to_string);
        Self::build(now, false, Some(code), message, None)
    }

    /// Wrap `result`, stamping the envelope with `now` (usually `Clock::now`).
    pub fn from_result(
        result: Result<T, Error>,
        messages: &ErrorMessages,
        now: DateTime<Utc>,
    ) -> Self {
        match result {
            Ok(payload) => Self::success(payload, now),
            Err(err) => {
                tracing::debug!(code = err.code(), error = %err, "Operation failed");
                Self::fail(err.code(), messages, now)
            }
        }
    }
}
