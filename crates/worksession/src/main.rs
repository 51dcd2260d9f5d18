//! Worksession - shared work sessions, leaderboard and scores.
//!
//! Main entry point for the Worksession CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, rankings, simulate, user};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Worksession - shared work sessions, leaderboard and scores
#[derive(Parser)]
#[command(name = "worksession")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output response envelopes as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// SQLite database holding users and scores
    #[arg(long, global = true, env = "WORKSESSION_DB", default_value = "worksession.db")]
    pub db: PathBuf,

    /// Project directory to look for worksession.toml in (default: current dir)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration inspection
    Config(config::ConfigArgs),

    /// User registration and scores
    User(user::UserArgs),

    /// Show the leaderboard
    Rankings(rankings::RankingsArgs),

    /// Run the session lifecycle in memory and print every step
    Simulate(simulate::SimulateArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "worksession=debug,worksession_core=debug,worksession_store=debug,worksession_config=debug,info"
    } else {
        "worksession=info,worksession_core=info,worksession_store=info,warn"
    };

    let log_dir = worksession_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "worksession.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "worksession=trace,worksession_core=trace,worksession_store=trace,worksession_cache=trace,worksession_config=trace,info",
                )),
        )
        .init();

    let loaded = worksession_config::load_config(cli.project_dir.as_deref())?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context::new(loaded, cli.db, cli.json, cli.verbose);

    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::User(args) => user::run(args, &ctx).await,
        Commands::Rankings(args) => rankings::run(args, &ctx).await,
        Commands::Simulate(args) => simulate::run(args, &ctx).await,
    }
}
