// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyContext, NotifyError, TemplateKind};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Recorded notification
#[derive(Debug, Clone)]
pub struct NotifyCall {
    pub kind: TemplateKind,
    pub context: NotifyContext,
}

/// Fake notification adapter for testing
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Kinds of the recorded notifications, in order
    pub fn kinds(&self) -> Vec<TemplateKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, kind: TemplateKind, context: &NotifyContext) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(NotifyCall {
                kind,
                context: context.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
