// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `qs clear`: delete old execution history

use super::Context;
use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Subcommand;
use qs_engine::maintenance::{
    clear_ongoing_executions, clear_successful_executions, DEFAULT_CLEAR_BEFORE_MINUTES,
};
use qs_core::MAX_INTERVAL_S;
use qs_engine::with_instance_lock;

const MAX_AGE_MINUTES: i64 = MAX_INTERVAL_S / 60;

#[derive(clap::Args)]
pub struct ClearArgs {
    #[command(subcommand)]
    command: ClearCommand,

    /// Only clear executions older than this many minutes
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_CLEAR_BEFORE_MINUTES,
        value_parser = clap::value_parser!(i64).range(-MAX_AGE_MINUTES..=MAX_AGE_MINUTES)
    )]
    before_minutes: i64,
}

#[derive(Subcommand, Clone, Copy)]
enum ClearCommand {
    /// Executions still marked ongoing
    Ongoing,
    /// Executions that finished successfully
    Successful,
}

impl ClearCommand {
    fn lock_name(self) -> &'static str {
        match self {
            ClearCommand::Ongoing => "clear_ongoing",
            ClearCommand::Successful => "clear_successful",
        }
    }
}

pub async fn handle(ctx: &Context, args: ClearArgs) -> Result<()> {
    let before = Utc::now() - Duration::minutes(args.before_minutes);
    let lock = ctx.instance_lock();
    let store = &ctx.store;

    let outcome = with_instance_lock(
        &lock,
        args.command.lock_name(),
        None,
        ctx.config.lock_wait(),
        move |handle| async move {
            let removed = match args.command {
                ClearCommand::Ongoing => clear_ongoing_executions(store, before),
                ClearCommand::Successful => clear_successful_executions(store, before),
            };
            handle.release();
            removed
        },
    )
    .await?;

    match outcome.transpose()? {
        Some(removed) => println!("Removed {removed} executions"),
        None => println!("Another instance is running {}", args.command.lock_name()),
    }
    Ok(())
}
