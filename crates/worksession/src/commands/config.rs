//! Config command - configuration inspection.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use worksession_config::{ErrorMessages, RankingConfig, SessionConfig, WorksessionConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration, defaults filled in
    Show,

    /// Show which config files are checked and which were loaded
    Which,

    /// Show the user configuration file path
    Path,

    /// Write a config file holding the defaults
    Init {
        /// Create project-local config (./worksession.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn effective(ctx: &Context) -> WorksessionConfig {
    let config = &ctx.loaded.config;
    filled(config.session(), config.ranking(), &config.error_messages())
}

fn filled(
    session: SessionConfig,
    ranking: RankingConfig,
    messages: &ErrorMessages,
) -> WorksessionConfig {
    WorksessionConfig {
        session: Some(session),
        ranking: Some(ranking),
        errors: messages
            .iter()
            .map(|(code, msg)| (code.to_string(), msg.to_string()))
            .collect(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = effective(ctx);
    if ctx.json_output {
        println!("{}", serde_json::to_string(&config)?);
        return Ok(());
    }

    println!("# Worksession Configuration\n");
    let sources = ctx.loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for path in sources {
            println!("# loaded: {}", path.display());
        }
        println!();
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    for source in &ctx.loaded.sources {
        let marker = if source.loaded { "loaded" } else { "missing" };
        println!("{:8} {}", marker, source.path.display());
    }
    for warning in &ctx.loaded.warnings {
        println!("warning  {}", warning);
    }
    Ok(())
}

fn cmd_path() -> Result<()> {
    match worksession_config::user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("no config directory available on this platform"),
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("worksession.toml")
    } else {
        worksession_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let defaults = filled(
        SessionConfig::default(),
        RankingConfig::default(),
        &ErrorMessages::default(),
    );
    worksession_config::save_config(&defaults, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
