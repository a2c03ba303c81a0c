// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use qs_adapters::NotifyContext;
use qs_core::Task;
use serde_json::Value;

/// Fields every notification carries
pub(crate) fn notify_context(task: Option<&Task>, host: &str) -> NotifyContext {
    let mut context = NotifyContext::new();
    context.insert("host".into(), host.into());
    if let Some(task) = task {
        context.insert("task".into(), task.id.to_string().into());
        context.insert("description".into(), task.to_string().into());
        context.insert("queue".into(), task.queue.clone().into());
        context.insert("repeat_interval".into(), task.repeat_interval.into());
        context.insert(
            "next_run".into(),
            task.next_run
                .map(|at| Value::String(at.to_rfc3339()))
                .unwrap_or(Value::Null),
        );
    }
    context
}
