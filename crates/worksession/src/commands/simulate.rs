//! Simulate command - drives one session through its lifecycle in memory.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use worksession_core::{
    Clock, MemoryUserStore, RankingCache, Response, ScoreKeeper, Session, SessionCoordinator,
    UserStore,
};

use super::Context;

/// Arguments for the simulate command.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Session code to use
    #[arg(long, default_value = "123456")]
    pub code: String,

    /// Session goal passed to start
    #[arg(long, default_value_t = 1500)]
    pub target: i64,

    /// Points awarded to each participant of a successful session
    #[arg(long, default_value_t = 10)]
    pub points: i64,
}

#[derive(Serialize)]
struct Step<'a, T> {
    step: &'a str,
    response: Response<T>,
}

fn report<T: Serialize>(
    ctx: &Context,
    step: &str,
    result: worksession_core::Result<T>,
    human: impl FnOnce(&T) -> String,
) -> Result<()> {
    let detail = result.as_ref().err().map(|e| e.to_string());
    let response = Response::from_result(result, &ctx.messages, ctx.clock.now());
    if ctx.json_output {
        println!("{}", serde_json::to_string(&Step { step, response })?);
    } else {
        match (&response.payload, detail) {
            (Some(payload), _) => println!("{:<14} {}", step, human(payload)),
            (None, Some(detail)) => println!(
                "{:<14} rejected [{}]: {}",
                step,
                response.code.unwrap_or_default(),
                detail
            ),
            (None, None) => println!("{:<14} ok", step),
        }
    }
    Ok(())
}

fn describe(session: &Session) -> String {
    let roster: Vec<&str> = session.roster().keys().map(String::as_str).collect();
    let mut line = format!("{} roster=[{}]", session.status(), roster.join(", "));
    if let Some(target) = session.target() {
        line.push_str(&format!(" target={}", target));
    }
    if let Some(blamed) = session.blamed_user() {
        line.push_str(&format!(" blamed={}", blamed.username));
    }
    line
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let clock = Arc::clone(&ctx.clock);
    let users = Arc::new(MemoryUserStore::new());
    let alice = users.insert_user("alice", clock.now_millis())?;
    let bob = users.insert_user("bob", clock.now_millis())?;

    let coordinator = Arc::new(SessionCoordinator::new(
        &config.session(),
        Arc::clone(&users),
        Arc::clone(&clock),
    )?);
    let code = args.code.as_str();

    report(ctx, "join alice", coordinator.join(code, alice.clone()), describe)?;
    report(ctx, "join bob", coordinator.join(code, bob.clone()), describe)?;
    report(ctx, "start", coordinator.start(code, args.target), describe)?;
    report(ctx, "leave alice", coordinator.leave(code, &alice.username), describe)?;
    report(ctx, "reset", coordinator.reset(code), describe)?;
    report(ctx, "join alice", coordinator.join(code, alice.clone()), describe)?;
    report(ctx, "start", coordinator.start(code, args.target), describe)?;

    // Two callers resolve the same session at once; one must lose.
    let racers: Vec<_> = (0..2)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let code = args.code.clone();
            tokio::task::spawn_blocking(move || coordinator.success(&code))
        })
        .collect();
    let mut winner = None;
    for (i, racer) in racers.into_iter().enumerate() {
        let outcome = racer.await.context("success racer panicked")?;
        if let Ok(session) = &outcome {
            winner = Some(session.clone());
        }
        report(ctx, &format!("success #{}", i + 1), outcome, describe)?;
    }

    let keeper = ScoreKeeper::new(Arc::clone(&users), Arc::clone(&clock));
    if let Some(session) = winner {
        for username in session.roster().keys() {
            report(
                ctx,
                "award",
                keeper.add_score(username, args.points),
                |user| format!("{} score={}", user.username, user.score),
            )?;
        }
    }

    let rankings = RankingCache::new(&config.ranking(), Arc::clone(&users), Arc::clone(&clock));
    report(
        ctx,
        "rankings",
        rankings.get_rankings(5).map(|s| (*s).clone()),
        |snapshot| {
            snapshot
                .entries
                .iter()
                .map(|e| format!("{}={}", e.username, e.score))
                .collect::<Vec<_>>()
                .join(", ")
        },
    )?;

    if ctx.verbose {
        let registry = coordinator.sessions().stats();
        println!(
            "{:<14} {} session(s) in namespace '{}'",
            "registry", registry.size, registry.namespace
        );
    }

    Ok(())
}
