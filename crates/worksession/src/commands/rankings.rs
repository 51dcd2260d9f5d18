//! Rankings command - the leaderboard read path.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use worksession_core::{RankingCache, RankingSnapshot};

use super::Context;

/// Arguments for the rankings command.
#[derive(Args, Debug)]
pub struct RankingsArgs {
    /// Number of entries
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Bypass the ranking cache
    #[arg(long)]
    pub forced: bool,
}

/// Run the rankings command.
pub async fn run(args: RankingsArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let rankings = RankingCache::new(&ctx.loaded.config.ranking(), store, Arc::clone(&ctx.clock));

    let result = if args.forced {
        rankings.get_latest_rankings(args.top)
    } else {
        rankings.get_rankings(args.top)
    };
    let verbose = ctx.verbose;
    ctx.emit(result.map(|snapshot| (*snapshot).clone()), |snapshot| {
        print_snapshot(snapshot);
        if verbose {
            println!("(generated {})", snapshot.generated_at.to_rfc3339());
        }
    })
}

fn print_snapshot(snapshot: &RankingSnapshot) {
    if snapshot.entries.is_empty() {
        println!("No users yet.");
        return;
    }
    for (rank, entry) in snapshot.entries.iter().enumerate() {
        println!("{:>3}. {:<20} {}", rank + 1, entry.username, entry.score);
    }
}
