// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod clear;
pub mod run_queue;
pub mod status;
pub mod task;

use crate::adapters::{make_notifier, make_runner, Notifier, Runner};
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use qs_adapters::TracedNotifyAdapter;
use qs_core::directive::parse_timestamp;
use qs_core::{SchedulerConfig, SystemClock, UuidIdGen};
use qs_engine::{host_identifier, EngineDeps, InstanceLock, SchedulerLoop};
use qs_storage::Store;
use std::path::Path;
use std::sync::Arc;

pub type Repo = Arc<Store>;
pub type QueueLoop =
    SchedulerLoop<Repo, Runner, TracedNotifyAdapter<Notifier>, SystemClock, UuidIdGen>;

/// Configuration and store shared by every command
pub struct Context {
    pub config: SchedulerConfig,
    pub store: Repo,
}

impl Context {
    pub fn load(config: Option<&Path>, store: &Path) -> Result<Self> {
        let config = match config {
            Some(path) => SchedulerConfig::load(path)?,
            None => SchedulerConfig::default(),
        };
        let store = Store::open(store)
            .with_context(|| format!("opening store {}", store.display()))?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Identifier used in notifications and lock names
    pub fn host(&self) -> String {
        self.config
            .lock_prefix
            .clone()
            .unwrap_or_else(host_identifier)
    }

    pub fn instance_lock(&self) -> InstanceLock<Repo, SystemClock> {
        InstanceLock::new(
            self.config.lock_dir.clone(),
            self.config.lock_prefix.as_deref(),
            self.store.clone(),
            SystemClock,
        )
    }

    /// Scheduler loop for `queue` under `config`
    pub fn queue_loop(&self, queue: &str, config: SchedulerConfig) -> QueueLoop {
        let deps = EngineDeps {
            repo: self.store.clone(),
            runner: make_runner(),
            notify: make_notifier(&config),
        };
        SchedulerLoop::new(
            queue,
            deps,
            SystemClock,
            UuidIdGen,
            Arc::new(config),
            self.host(),
        )
    }
}

/// `now` or an RFC 3339 timestamp
pub fn parse_when(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if text.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    parse_timestamp(text).with_context(|| format!("invalid timestamp: {text}"))
}
