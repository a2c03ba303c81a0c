// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler engine

use crate::lock::LockError;
use qs_adapters::NotifyError;
use qs_core::RepoError;
use thiserror::Error;

/// Errors that escape the engine.
///
/// A failing task program is not one of them: that outcome is recorded on
/// the execution and the task is rescheduled.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
    #[error("task not found: {0}")]
    TaskNotFound(String),
}
