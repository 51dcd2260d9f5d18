//! Configuration for the work-session coordinator.
//!
//! Provides TOML-based configuration with:
//! - `[session]`: session-code format and reset roster policy
//! - `[ranking]`: leaderboard cache TTL and request bounds
//! - `[errors]`: error-code to human-readable message table
//! - Config file layering (user config dir + project-local override)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
