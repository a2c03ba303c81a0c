// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command runner adapters
//!
//! A runner launches the program behind a task and streams what it writes
//! into an [`OutputBuffer`] owned by the caller. The buffer outlives the
//! run, so output produced before a timeout or failure is still there.

mod process;

pub use process::ProcessRunner;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCommandRunner, FakeResponse};

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from running a task program
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {}", exit_label(.code))]
    Failed { command: String, code: Option<i32> },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// What to run, and the context handed to the program
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub arguments: Vec<String>,
    /// Suggested seconds until the next run
    pub next_interval_secs: u64,
}

impl Invocation {
    pub fn new(command: impl Into<String>, arguments: Vec<String>, next_interval_secs: u64) -> Self {
        Self {
            command: command.into(),
            arguments,
            next_interval_secs,
        }
    }
}

/// Shared, size-bounded sink for a run's output.
///
/// When the limit is exceeded the oldest text is dropped, so the trailing
/// lines (where a next-run directive lives) are always kept.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: Arc<Mutex<String>>,
    limit: Option<usize>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            text: Arc::default(),
            limit: Some(limit),
        }
    }

    /// An empty buffer with the same size limit
    pub fn empty_like(&self) -> Self {
        Self {
            text: Arc::default(),
            limit: self.limit,
        }
    }

    pub fn push_str(&self, s: &str) {
        let mut text = self.text.lock().unwrap_or_else(|e| e.into_inner());
        text.push_str(s);
        if let Some(limit) = self.limit {
            if text.len() > limit {
                let mut cut = text.len() - limit;
                while !text.is_char_boundary(cut) {
                    cut += 1;
                }
                text.drain(..cut);
            }
        }
    }

    /// Append one line, adding the newline
    pub fn push_line(&self, line: &str) {
        self.push_str(line);
        self.push_str("\n");
    }

    pub fn contents(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

/// Runs task programs
#[async_trait]
pub trait CommandRunner: Clone + Send + Sync + 'static {
    /// Run to completion, writing output into `output` as it arrives.
    ///
    /// Dropping the returned future must stop the program.
    async fn run(&self, invocation: &Invocation, output: &OutputBuffer) -> Result<(), RunnerError>;
}
