// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake command runner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CommandRunner, Invocation, OutputBuffer, RunnerError};
use async_trait::async_trait;
use qs_core::FakeClock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted behavior for one command
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    pub output: String,
    /// Sleep (on the tokio clock) after writing the output
    pub delay: Option<Duration>,
    /// Fail with this message instead of succeeding
    pub error: Option<String>,
}

impl FakeResponse {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: text.into(),
            ..Default::default()
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

#[derive(Default)]
struct FakeState {
    responses: HashMap<String, FakeResponse>,
    calls: Vec<Invocation>,
    clock: Option<FakeClock>,
}

/// Fake runner with per-command scripted responses.
///
/// Unscripted commands succeed silently.
#[derive(Clone, Default)]
pub struct FakeCommandRunner {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for `command`
    pub fn on(&self, command: &str, response: FakeResponse) -> &Self {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .responses
            .insert(command.to_string(), response);
        self
    }

    /// Advance `clock` by a second for every second a scripted delay
    /// sleeps, so recorded timestamps follow the tokio clock
    pub fn drive_clock(&self, clock: FakeClock) -> &Self {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clock = Some(clock);
        self
    }

    /// Get all recorded invocations
    pub fn calls(&self) -> Vec<Invocation> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(&self, invocation: &Invocation, output: &OutputBuffer) -> Result<(), RunnerError> {
        let (response, clock) = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.calls.push(invocation.clone());
            let response = inner
                .responses
                .get(&invocation.command)
                .cloned()
                .unwrap_or_default();
            (response, inner.clock.clone())
        };

        output.push_str(&response.output);
        match (response.delay, clock) {
            (Some(delay), Some(clock)) => {
                let second = Duration::from_secs(1);
                let mut left = delay;
                while left >= second {
                    tokio::time::sleep(second).await;
                    clock.advance_secs(1);
                    left -= second;
                }
                tokio::time::sleep(left).await;
            }
            (Some(delay), None) => tokio::time::sleep(delay).await,
            (None, _) => {}
        }
        match response.error {
            Some(message) => Err(RunnerError::Other(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
