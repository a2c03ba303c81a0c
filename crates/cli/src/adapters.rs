// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production adapters for CLI commands

use async_trait::async_trait;
use qs_adapters::{
    CommandNotifier, LogNotifier, NotifyAdapter, NotifyContext, NotifyError, ProcessRunner,
    TemplateKind, TracedNotifyAdapter, TracedRunner,
};
use qs_core::SchedulerConfig;

/// Runner used by `run-queue`
pub type Runner = TracedRunner<ProcessRunner>;

/// Notifier selected by `notify_command`
#[derive(Clone)]
pub enum Notifier {
    Log(LogNotifier),
    Command(CommandNotifier),
}

impl Notifier {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        match config
            .notify_command
            .as_deref()
            .and_then(CommandNotifier::from_argv)
        {
            Some(command) => Notifier::Command(command),
            None => Notifier::Log(LogNotifier::new()),
        }
    }
}

#[async_trait]
impl NotifyAdapter for Notifier {
    async fn notify(&self, kind: TemplateKind, context: &NotifyContext) -> Result<(), NotifyError> {
        match self {
            Notifier::Log(inner) => inner.notify(kind, context).await,
            Notifier::Command(inner) => inner.notify(kind, context).await,
        }
    }
}

pub fn make_runner() -> Runner {
    TracedRunner::new(ProcessRunner::new())
}

pub fn make_notifier(config: &SchedulerConfig) -> TracedNotifyAdapter<Notifier> {
    TracedNotifyAdapter::new(Notifier::from_config(config))
}
