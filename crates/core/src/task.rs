// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring task definition
//!
//! A task names a program, the arguments to hand it, and the lane (queue)
//! it runs in. `next_run` drives dispatch: a task is due once it is set and
//! no longer in the future, and is never dispatched while it is unset.

use crate::id::TaskId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Queue used when a task does not name one
pub const DEFAULT_QUEUE: &str = "default";

/// Longest interval, in seconds, accepted for any schedule or timeout
pub const MAX_INTERVAL_S: i64 = 100 * 365 * 24 * 60 * 60;

/// A recurring unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Program to execute
    pub command: String,
    /// Argument text, one argument per line (or whitespace separated)
    #[serde(default)]
    pub arguments: String,
    pub queue: String,
    /// Default reschedule delay in seconds
    #[serde(default)]
    pub repeat_interval: i64,
    /// Hard timeout for one execution, in seconds
    #[serde(default)]
    pub max_duration: Option<u64>,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub postpone_alert_until: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            arguments: String::new(),
            queue: DEFAULT_QUEUE.to_string(),
            repeat_interval: 0,
            max_duration: None,
            next_run: None,
            postpone_alert_until: None,
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn in_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn every(mut self, secs: i64) -> Self {
        self.repeat_interval = secs;
        self
    }

    pub fn with_max_duration(mut self, secs: u64) -> Self {
        self.max_duration = Some(secs);
        self
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_run = Some(at);
        self
    }

    /// Split the stored argument text into an argument list
    pub fn argument_list(&self) -> Vec<String> {
        split_arguments(&self.arguments)
    }

    /// Reschedule interval: `repeat_interval` when it is at least one
    /// second, `fallback_secs` otherwise
    pub fn effective_interval(&self, fallback_secs: u64) -> Duration {
        let secs = if self.repeat_interval >= 1 {
            Some(self.repeat_interval)
        } else {
            i64::try_from(fallback_secs).ok()
        };
        secs.and_then(Duration::try_seconds).unwrap_or(Duration::MAX)
    }

    /// Hard timeout, falling back to the process-wide default
    pub fn effective_max_duration(&self, default_secs: Option<u64>) -> Option<u64> {
        self.max_duration.or(default_secs)
    }

    /// Due when `next_run` is set and not in the future
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|at| at <= now)
    }

    /// Alerts are suppressed until `postpone_alert_until` passes
    pub fn alerts_postponed(&self, now: DateTime<Utc>) -> bool {
        self.postpone_alert_until.is_some_and(|until| until > now)
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.command, self.queue)?;
        let args = self.argument_list();
        if !args.is_empty() {
            write!(f, " {}", args.join(" "))?;
        }
        Ok(())
    }
}

/// Split argument text into a list.
///
/// Multi-line text yields one argument per non-blank line, so a single
/// argument may contain spaces. Single-line text is split on whitespace.
pub fn split_arguments(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [] => Vec::new(),
        [single] if !text.trim().contains('\n') => {
            single.split_whitespace().map(str::to_string).collect()
        }
        many => many.iter().map(|line| line.to_string()).collect(),
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
