// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `qs status`: queue health as JSON

use super::Context;
use crate::output::print_json;
use anyhow::Result;
use qs_core::SystemClock;
use qs_engine::HealthEvaluator;
use std::sync::Arc;

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Restrict the report to one queue
    #[arg(long)]
    queue: Option<String>,
}

/// Prints `{"status": "ok"|"error", "issues": [...]}`. Always exits 0 so a
/// probe reads the payload rather than the exit code.
pub async fn handle(ctx: &Context, args: StatusArgs) -> Result<()> {
    let health = HealthEvaluator::new(
        ctx.store.clone(),
        crate::adapters::make_notifier(&ctx.config),
        SystemClock,
        Arc::new(ctx.config.clone()),
        ctx.host(),
    );
    let report = health.report(args.queue.as_deref()).await?;
    print_json(&report)?;
    Ok(())
}
