//! CLI command handlers.

pub mod config;
pub mod rankings;
pub mod simulate;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;
use worksession_config::{ErrorMessages, LoadedConfig};
use worksession_core::{Clock, Response, SystemClock};
use worksession_store::SqliteUserStore;

/// Shared context for all commands.
#[derive(Clone)]
pub struct Context {
    /// Merged configuration and where it came from.
    pub loaded: LoadedConfig,
    /// Error-code table resolved from config.
    pub messages: ErrorMessages,
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Time source for envelopes and every component a command builds.
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new(loaded: LoadedConfig, db_path: PathBuf, json_output: bool, verbose: bool) -> Self {
        let messages = loaded.config.error_messages();
        Self {
            loaded,
            messages,
            db_path,
            json_output,
            verbose,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn open_store(&self) -> Result<SqliteUserStore> {
        SqliteUserStore::open(&self.db_path)
            .with_context(|| format!("failed to open database {}", self.db_path.display()))
    }

    /// Print an operation's outcome and turn a failure into a non-zero exit.
    ///
    /// JSON mode prints the whole envelope; otherwise `human` renders the payload.
    pub fn emit<T, F>(&self, result: worksession_core::Result<T>, human: F) -> Result<()>
    where
        T: Serialize,
        F: FnOnce(&T),
    {
        let detail = result.as_ref().err().map(|e| e.to_string());
        let response = Response::from_result(result, &self.messages, self.clock.now());

        if self.json_output {
            println!("{}", serde_json::to_string(&response)?);
        } else if let Some(payload) = &response.payload {
            human(payload);
        }

        match detail {
            None => Ok(()),
            Some(detail) => anyhow::bail!(
                "[{}] {}: {}",
                response.code.unwrap_or_default(),
                response.message.as_deref().unwrap_or("error"),
                detail
            ),
        }
    }
}
