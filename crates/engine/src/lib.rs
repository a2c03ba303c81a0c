// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quicksilver scheduler engine: instance locking, task execution,
//! health evaluation, and the per-queue loop

mod context;
mod error;
mod executor;
mod health;
mod lock;
pub mod maintenance;
mod scheduler;

pub use error::EngineError;
pub use executor::{EngineDeps, ExecutionEngine, RunFailure};
pub use health::{HealthEvaluator, HealthIssue, HealthReport, HealthStatus};
pub use lock::{
    host_identifier, slugify, system_boot_time, with_instance_lock, InstanceLock, LockError,
    LockHandle,
};
pub use scheduler::{CycleSummary, SchedulerLoop};
