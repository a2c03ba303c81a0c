// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters

mod command;
mod log;

pub use command::CommandNotifier;
pub use log::LogNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Context handed to a notification template
pub type NotifyContext = serde_json::Map<String, serde_json::Value>;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notify command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which message to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// An open execution is running abnormally long
    TaskRunningLong,
    /// A due task has not started
    TaskOverdueNeverStarted,
    /// An execution from a previous scheduler instance was killed
    ExecutionStaleKilled,
    /// An execution was killed for exceeding its max duration
    ExecutionExceededMaxDuration,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::TaskRunningLong => "task_running_long",
            TemplateKind::TaskOverdueNeverStarted => "task_overdue_never_started",
            TemplateKind::ExecutionStaleKilled => "execution_stale_killed",
            TemplateKind::ExecutionExceededMaxDuration => "execution_exceeded_max_duration",
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter for delivering alerts to operators
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn notify(&self, kind: TemplateKind, context: &NotifyContext) -> Result<(), NotifyError>;
}

/// Notifier that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifyAdapter;

impl NoOpNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn notify(&self, _kind: TemplateKind, _context: &NotifyContext) -> Result<(), NotifyError> {
        Ok(())
    }
}
