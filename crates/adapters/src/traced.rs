// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::notify::{NotifyAdapter, NotifyContext, NotifyError, TemplateKind};
use crate::runner::{CommandRunner, Invocation, OutputBuffer, RunnerError};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any CommandRunner
#[derive(Clone)]
pub struct TracedRunner<R> {
    inner: R,
}

impl<R> TracedRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: CommandRunner> CommandRunner for TracedRunner<R> {
    async fn run(&self, invocation: &Invocation, output: &OutputBuffer) -> Result<(), RunnerError> {
        let span = tracing::info_span!("runner.run", command = %invocation.command);

        async {
            tracing::info!(
                args = ?invocation.arguments,
                next_interval = invocation.next_interval_secs,
                "starting"
            );

            // Precondition: something to run
            if invocation.command.trim().is_empty() {
                tracing::error!("empty command");
                return Err(RunnerError::Other("task has no command".to_string()));
            }

            let start = std::time::Instant::now();
            let result = self.inner.run(invocation, output).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "finished"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "run failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any NotifyAdapter
#[derive(Clone)]
pub struct TracedNotifyAdapter<N> {
    inner: N,
}

impl<N> TracedNotifyAdapter<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: NotifyAdapter> NotifyAdapter for TracedNotifyAdapter<N> {
    async fn notify(&self, kind: TemplateKind, context: &NotifyContext) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify", template = %kind);

        async {
            let result = self.inner.notify(kind, context).await;
            match &result {
                Ok(()) => tracing::debug!(keys = context.len(), "sent"),
                Err(e) => tracing::warn!(error = %e, "notify failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
