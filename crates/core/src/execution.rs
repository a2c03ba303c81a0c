// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution records
//!
//! One execution is one run of a task:
//!
//! ```text
//! pending -> ongoing -> success | error | killed
//! ```
//!
//! `pending` and `ongoing` are transient; the other three are terminal.
//! An execution with `ended` unset is open, whatever its status says.

use crate::id::{ExecutionId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Ongoing,
    Success,
    Error,
    /// Forcibly terminated as stuck or stale
    Killed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Killed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Ongoing => "ongoing",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Killed => "killed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "ongoing" => Ok(ExecutionStatus::Ongoing),
            "success" => Ok(ExecutionStatus::Success),
            "error" => Ok(ExecutionStatus::Error),
            "killed" => Ok(ExecutionStatus::Killed),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// One run of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub task_id: TaskId,
    pub started: DateTime<Utc>,
    #[serde(default)]
    pub ended: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    /// Everything the run wrote to its output stream (bounded)
    #[serde(default)]
    pub output: String,
    /// Seconds between `started` and `ended`, cached once the run closes
    #[serde(default)]
    pub total_runtime: Option<f64>,
}

impl Execution {
    /// A fresh `pending` execution
    pub fn new(id: impl Into<ExecutionId>, task_id: TaskId, started: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            task_id,
            started,
            ended: None,
            status: ExecutionStatus::Pending,
            output: String::new(),
            total_runtime: None,
        }
    }

    /// Still running, or abandoned without being closed
    pub fn is_open(&self) -> bool {
        self.ended.is_none()
    }

    /// Close the execution with a terminal status
    pub fn finish(&mut self, status: ExecutionStatus, ended: DateTime<Utc>) {
        self.status = status;
        self.ended = Some(ended);
        self.total_runtime = None;
        self.runtime(ended);
    }

    /// Runtime in seconds.
    ///
    /// Closed executions compute `ended - started` once and keep it;
    /// open ones report a snapshot against `now` without caching it.
    pub fn runtime(&mut self, now: DateTime<Utc>) -> f64 {
        if let Some(cached) = self.total_runtime {
            return cached;
        }
        match self.ended {
            Some(ended) => {
                let secs = seconds_between(self.started, ended);
                self.total_runtime = Some(secs);
                secs
            }
            None => seconds_between(self.started, now),
        }
    }

    /// Runtime without touching the cache
    pub fn runtime_at(&self, now: DateTime<Utc>) -> f64 {
        self.total_runtime
            .unwrap_or_else(|| seconds_between(self.started, self.ended.unwrap_or(now)))
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}
