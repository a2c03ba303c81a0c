// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log

use crate::execution::Execution;
use crate::id::{ExecutionId, TaskId};
use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL.
///
/// Saves carry the whole record so replay is a plain upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Create or replace a task
    TaskSave { task: Task },

    /// Delete a task; its executions go with it
    TaskDelete { id: TaskId },

    /// Create or replace an execution
    ExecutionSave { execution: Execution },

    /// Delete one execution
    ExecutionDelete { id: ExecutionId },
}

impl Operation {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Operation::TaskSave { .. } => "task:save",
            Operation::TaskDelete { .. } => "task:delete",
            Operation::ExecutionSave { .. } => "execution:save",
            Operation::ExecutionDelete { .. } => "execution:delete",
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
