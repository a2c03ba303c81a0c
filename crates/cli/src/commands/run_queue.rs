// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `qs run-queue`: the scheduler loop for one queue

use super::Context;
use anyhow::Result;
use qs_core::DEFAULT_QUEUE;
use qs_engine::with_instance_lock;

#[derive(clap::Args)]
pub struct RunQueueArgs {
    /// Queue to serve
    #[arg(long, default_value = DEFAULT_QUEUE)]
    task_queue: String,

    /// Target cycle length in seconds
    #[arg(long)]
    sleep_duration: Option<u64>,

    /// Seconds to wait for a busy queue lock
    #[arg(long)]
    lock_wait: Option<u64>,

    /// Exit after this many minutes so a fresh process takes over
    #[arg(long)]
    restart_after: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

pub async fn handle(ctx: &Context, args: RunQueueArgs) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(secs) = args.sleep_duration {
        config.sleep_duration_s = secs;
    }
    if let Some(secs) = args.lock_wait {
        config.lock_wait_s = Some(secs);
    }
    if let Some(minutes) = args.restart_after {
        config.restart_after_minutes = minutes;
    }
    config.validate()?;
    let lock_wait = config.lock_wait();

    let queue_loop = ctx.queue_loop(&args.task_queue, config);
    let lock = ctx.instance_lock();

    if args.once {
        let name = queue_loop.lock_name();
        let looper = &queue_loop;
        let outcome = with_instance_lock(
            &lock,
            &name,
            Some(args.task_queue.as_str()),
            lock_wait,
            move |handle| async move {
                let summary = looper.run_once().await;
                handle.release();
                summary
            },
        )
        .await?;
        if let Some(summary) = outcome.transpose()? {
            tracing::info!(
                queue = %args.task_queue,
                due = summary.due,
                dispatched = summary.dispatched,
                alerted = summary.alerted,
                "cycle complete"
            );
        }
        return Ok(());
    }

    if !queue_loop.run_locked(&lock, shutdown_signal()).await? {
        tracing::info!(queue = %args.task_queue, "another instance is serving this queue");
    }
    Ok(())
}

/// Resolves on SIGTERM or Ctrl-C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
