//! User command - registration and score updates.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use worksession_core::{Clock, Error, ScoreKeeper, User, UserStore};

use super::Context;

/// Arguments for the user command.
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new user with score 0
    Add {
        /// Unique username
        username: String,
    },

    /// Show a user's score and version
    Show {
        username: String,
    },

    /// Add points to a user's score (retries on concurrent updates)
    Score {
        username: String,

        /// Points to add (may be negative)
        #[arg(allow_hyphen_values = true)]
        delta: i64,

        /// Attempts before giving up on a contended row
        #[arg(long, default_value_t = worksession_core::DEFAULT_MAX_ATTEMPTS)]
        attempts: usize,
    },
}

/// Run the user command.
pub async fn run(args: UserArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    match args.command {
        UserCommand::Add { username } => {
            let result = store.insert_user(&username, ctx.clock.now_millis());
            ctx.emit(result, print_user)
        }
        UserCommand::Show { username } => {
            let result = store
                .get_by_username(&username)
                .and_then(|u| u.ok_or_else(|| Error::NotFound(format!("user {}", username))));
            ctx.emit(result, print_user)
        }
        UserCommand::Score {
            username,
            delta,
            attempts,
        } => {
            let keeper =
                ScoreKeeper::new(store, Arc::clone(&ctx.clock)).with_max_attempts(attempts);
            ctx.emit(keeper.add_score(&username, delta), print_user)
        }
    }
}

fn print_user(user: &User) {
    println!(
        "{} (id {}): score {}, version {}",
        user.username, user.id, user.score, user.updated
    );
}
