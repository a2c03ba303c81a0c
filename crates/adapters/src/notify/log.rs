// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifier that writes alerts to the log

use super::{NotifyAdapter, NotifyContext, NotifyError, TemplateKind};
use async_trait::async_trait;

/// Emits each notification as a structured `warn` event
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for LogNotifier {
    async fn notify(&self, kind: TemplateKind, context: &NotifyContext) -> Result<(), NotifyError> {
        let task = context
            .get("task")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let payload = serde_json::to_string(context)?;
        tracing::warn!(template = %kind, task, context = %payload, "alert");
        Ok(())
    }
}
