// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qs - quicksilver recurring task scheduler

mod adapters;
mod commands;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{clear, run_queue, status, task};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qs", version, about = "quicksilver - recurring task scheduler")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "QS_CONFIG")]
    config: Option<PathBuf>,

    /// Task store (write-ahead log)
    #[arg(long, global = true, env = "QS_STORE", default_value = "quicksilver.wal")]
    store: PathBuf,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler loop for one queue
    RunQueue(run_queue::RunQueueArgs),
    /// Report queue health as JSON
    Status(status::StatusArgs),
    /// Task administration
    Task(task::TaskArgs),
    /// Delete old execution records
    Clear(clear::ClearArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::setup_logging(cli.verbose, cli.log_file.as_deref())?;
    let ctx = commands::Context::load(cli.config.as_deref(), &cli.store)?;

    match cli.command {
        Commands::RunQueue(args) => run_queue::handle(&ctx, args).await,
        Commands::Status(args) => status::handle(&ctx, args).await,
        Commands::Task(args) => task::handle(&ctx, args.command),
        Commands::Clear(args) => clear::handle(&ctx, args).await,
    }
}
