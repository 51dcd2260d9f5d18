//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [session]
//! code_pattern = "[0-9]{6}"
//! reset_roster = "keep"
//!
//! [ranking]
//! cache_ttl_secs = 60
//! max_top = 100
//!
//! [errors]
//! 1002 = "session is busy"
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Stable numeric codes surfaced to the request layer.
pub mod error_codes {
    pub const INVALID_ARGUMENT: u32 = 1001;
    pub const INVALID_STATE: u32 = 1002;
    pub const NOT_FOUND: u32 = 1003;
    pub const CONFLICT: u32 = 1004;
    pub const STORAGE: u32 = 1500;
}

/// Default session-code format: six ASCII digits.
pub const DEFAULT_CODE_PATTERN: &str = "[0-9]{6}";

/// Default freshness window for cached rankings.
pub const DEFAULT_RANKING_TTL_SECS: u64 = 60;

/// Default upper bound for a requested ranking length.
pub const DEFAULT_MAX_TOP: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorksessionConfig {
    /// Session coordinator settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    /// Leaderboard cache settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingConfig>,

    /// Error-code overrides keyed by the code's decimal string.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl WorksessionConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: WorksessionConfig) {
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.ranking.is_some() {
            self.ranking = other.ranking;
        }
        self.errors.extend(other.errors);
    }

    /// Effective session settings.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Effective ranking settings.
    pub fn ranking(&self) -> RankingConfig {
        self.ranking.clone().unwrap_or_default()
    }

    /// Built-in messages overlaid with the `[errors]` table.
    ///
    /// Keys that are not decimal integers are ignored.
    pub fn error_messages(&self) -> ErrorMessages {
        let mut messages = ErrorMessages::default();
        for (code, message) in &self.errors {
            match code.trim().parse::<u32>() {
                Ok(code) => messages.set(code, message.clone()),
                Err(_) => tracing::warn!(key = %code, "Ignoring non-numeric [errors] key"),
            }
        }
        messages
    }

    /// Check every section for values the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.session().validate()?;
        self.ranking().validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// What a reset does to the roster of a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetRoster {
    /// Keep everyone still on the roster; only completion fields are cleared.
    #[default]
    Keep,
    /// Empty the roster as well.
    Clear,
}

/// Session coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Regex a session code must match in full.
    pub code_pattern: String,

    /// Roster handling on reset.
    pub reset_roster: ResetRoster,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            code_pattern: DEFAULT_CODE_PATTERN.to_string(),
            reset_roster: ResetRoster::default(),
        }
    }
}

impl SessionConfig {
    /// Compile `code_pattern` anchored at both ends.
    pub fn compile_code_pattern(&self) -> Result<Regex> {
        Regex::new(&format!("^(?:{})$", self.code_pattern)).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: self.code_pattern.clone(),
                reason: e.to_string(),
            }
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.compile_code_pattern().map(|_| ())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ranking
// ─────────────────────────────────────────────────────────────────────────────

/// Leaderboard cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    /// Seconds a cached snapshot stays usable.
    pub cache_ttl_secs: u64,

    /// Largest ranking length a caller may request.
    pub max_top: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_RANKING_TTL_SECS,
            max_top: DEFAULT_MAX_TOP,
        }
    }
}

impl RankingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_top == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ranking.max_top".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error messages
// ─────────────────────────────────────────────────────────────────────────────

/// Error-code to message table used when building response envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessages {
    messages: BTreeMap<u32, String>,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        let messages = [
            (error_codes::INVALID_ARGUMENT, "invalid argument"),
            (
                error_codes::INVALID_STATE,
                "operation not allowed in current session state",
            ),
            (error_codes::NOT_FOUND, "not found"),
            (error_codes::CONFLICT, "update conflict, re-read and retry"),
            (error_codes::STORAGE, "storage failure"),
        ]
        .into_iter()
        .map(|(code, message)| (code, message.to_string()))
        .collect();
        Self { messages }
    }
}

impl ErrorMessages {
    pub fn message_for(&self, code: u32) -> Option<&str> {
        self.messages.get(&code).map(String::as_str)
    }

    pub fn set(&mut self, code: u32, message: impl Into<String>) {
        self.messages.insert(code, message.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.messages.iter().map(|(code, msg)| (*code, msg.as_str()))
    }
}
