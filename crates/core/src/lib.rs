// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qs-core: data model and policy primitives for the quicksilver scheduler
//!
//! This crate provides:
//! - Task and execution records with their lifecycle rules
//! - The repository interface the scheduler consumes
//! - Clock and id abstractions for deterministic tests
//! - Scheduler configuration, runtime statistics, and the next-run directive

pub mod clock;
pub mod config;
pub mod directive;
pub mod execution;
pub mod id;
pub mod operation;
pub mod repository;
pub mod stats;
pub mod task;

// Re-exports
pub use clock::{saturating_add, Clock, FakeClock, SystemClock};
pub use config::{ConfigError, SchedulerConfig};
pub use directive::{format_next_run_directive, parse_next_run_directive, DirectiveError};
pub use execution::{Execution, ExecutionStatus};
pub use id::{ExecutionId, IdGen, SequentialIdGen, TaskId, UuidIdGen};
pub use operation::Operation;
pub use repository::{ExecutionFilter, RepoError, TaskRepository};
pub use stats::RuntimeStats;
pub use task::{split_arguments, Task, DEFAULT_QUEUE, MAX_INTERVAL_S};
