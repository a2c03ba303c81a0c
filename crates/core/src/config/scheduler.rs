// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration
//!
//! Every process-wide tunable lives here and is threaded through
//! constructors. Values are whole seconds unless the field name says
//! otherwise.

use crate::task::MAX_INTERVAL_S;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {field} = {value} exceeds {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Tunables for the lock, the loop, the engine, and the alert policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Directory holding lock files and the startup marker
    pub lock_dir: PathBuf,
    /// Host/site identifier used to name locks; hostname when unset
    pub lock_prefix: Option<String>,
    /// How long to wait for a busy lock; `None` fails fast
    pub lock_wait_s: Option<u64>,
    /// Runtime floor below which a long-running execution never alerts
    pub min_task_alert_runtime_s: u64,
    /// Runtime ceiling above which a long-running execution alerts
    pub max_task_runtime_s: Option<u64>,
    /// Alert debounce window
    pub alert_interval_s: u64,
    /// How late a task may start before it counts as overdue
    pub overdue_grace_s: u64,
    /// Lower bound on the sleep between cycles
    pub min_cycle_sleep_s: u64,
    /// Hard timeout for tasks without their own `max_duration`
    pub default_max_duration_s: Option<u64>,
    /// Reschedule interval for tasks whose `repeat_interval` is below one second
    pub default_repeat_interval_s: u64,
    /// Target length of one polling cycle
    pub sleep_duration_s: u64,
    /// Minutes after which the loop exits so a fresh process takes over
    pub restart_after_minutes: u64,
    /// Upper bound on captured output kept per execution
    pub max_output_bytes: usize,
    /// Program (and leading arguments) that receives notifications;
    /// notifications are only logged when unset
    pub notify_command: Option<Vec<String>>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lock_dir: std::env::temp_dir(),
            lock_prefix: None,
            lock_wait_s: None,
            min_task_alert_runtime_s: 60,
            max_task_runtime_s: None,
            alert_interval_s: 15 * 60,
            overdue_grace_s: 120,
            min_cycle_sleep_s: 1,
            default_max_duration_s: None,
            default_repeat_interval_s: 5,
            sleep_duration_s: 5,
            restart_after_minutes: 30,
            max_output_bytes: 1024 * 1024,
            notify_command: None,
        }
    }
}

impl SchedulerConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject durations too long to add to a timestamp
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = MAX_INTERVAL_S as u64;
        let durations = [
            ("lock_wait_s", self.lock_wait_s),
            ("min_task_alert_runtime_s", Some(self.min_task_alert_runtime_s)),
            ("max_task_runtime_s", self.max_task_runtime_s),
            ("alert_interval_s", Some(self.alert_interval_s)),
            ("overdue_grace_s", Some(self.overdue_grace_s)),
            ("min_cycle_sleep_s", Some(self.min_cycle_sleep_s)),
            ("default_max_duration_s", self.default_max_duration_s),
            ("default_repeat_interval_s", Some(self.default_repeat_interval_s)),
            ("sleep_duration_s", Some(self.sleep_duration_s)),
            ("restart_after_minutes", Some(self.restart_after_minutes.saturating_mul(60))),
        ];
        for (field, value) in durations {
            if let Some(value) = value.filter(|v| *v > max) {
                return Err(ConfigError::OutOfRange { field, value, max });
            }
        }
        Ok(())
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn lock_wait(&self) -> Option<Duration> {
        self.lock_wait_s.map(Duration::from_secs)
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_duration_s)
    }

    pub fn min_cycle_sleep(&self) -> Duration {
        Duration::from_secs(self.min_cycle_sleep_s)
    }

    pub fn restart_after(&self) -> Duration {
        Duration::from_secs(self.restart_after_minutes.saturating_mul(60))
    }

    pub fn alert_interval(&self) -> chrono::Duration {
        seconds(self.alert_interval_s)
    }

    pub fn overdue_grace(&self) -> chrono::Duration {
        seconds(self.overdue_grace_s)
    }
}

fn seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
