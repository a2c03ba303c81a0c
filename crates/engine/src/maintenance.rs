// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Housekeeping sweeps over execution history

use chrono::{DateTime, Utc};
use qs_core::{ExecutionFilter, ExecutionStatus, RepoError, TaskRepository};

/// Default age, in minutes, before history is cleared
pub const DEFAULT_CLEAR_BEFORE_MINUTES: i64 = 120;

/// Delete `ongoing` executions started at or before `before`
pub fn clear_ongoing_executions<R: TaskRepository>(
    repo: &R,
    before: DateTime<Utc>,
) -> Result<usize, RepoError> {
    let removed = repo.delete_executions(&ExecutionFilter {
        status: Some(ExecutionStatus::Ongoing),
        started_before: Some(before),
        ..Default::default()
    })?;
    tracing::info!(removed, %before, "cleared ongoing executions");
    Ok(removed)
}

/// Delete `success` executions that ended at or before `before`
pub fn clear_successful_executions<R: TaskRepository>(
    repo: &R,
    before: DateTime<Utc>,
) -> Result<usize, RepoError> {
    let removed = repo.delete_executions(&ExecutionFilter {
        status: Some(ExecutionStatus::Success),
        ended_before: Some(before),
        ..Default::default()
    })?;
    tracing::info!(removed, %before, "cleared successful executions");
    Ok(removed)
}
