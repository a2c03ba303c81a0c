// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built from WAL operations

use qs_core::{Execution, ExecutionId, Operation, Task, TaskId};
use std::collections::BTreeMap;

/// Materialized state built from WAL operations
#[derive(Debug, Default, Clone)]
pub struct MaterializedState {
    pub tasks: BTreeMap<TaskId, Task>,
    pub executions: BTreeMap<ExecutionId, Execution>,
}

impl MaterializedState {
    /// Get a task by ID or unique prefix
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        if let Some(task) = self.tasks.get(&TaskId::from(id)) {
            return Some(task);
        }
        let mut matches = self.tasks.values().filter(|t| t.id.as_str().starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Some(task),
            _ => None,
        }
    }

    /// Executions of one task, oldest first
    pub fn executions_of(&self, task_id: &TaskId) -> Vec<&Execution> {
        let mut execs: Vec<&Execution> = self
            .executions
            .values()
            .filter(|e| &e.task_id == task_id)
            .collect();
        execs.sort_by(|a, b| a.started.cmp(&b.started).then_with(|| a.id.cmp(&b.id)));
        execs
    }

    /// Operations that rebuild this state from empty: tasks first, so every
    /// execution lands after its task
    pub fn snapshot_ops(&self) -> Vec<Operation> {
        let tasks = self
            .tasks
            .values()
            .map(|task| Operation::TaskSave { task: task.clone() });
        let executions = self
            .executions
            .values()
            .map(|execution| Operation::ExecutionSave {
                execution: execution.clone(),
            });
        tasks.chain(executions).collect()
    }

    /// Apply an operation to the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::TaskSave { task } => {
                self.tasks.insert(task.id.clone(), task.clone());
            }
            Operation::TaskDelete { id } => {
                self.tasks.remove(id);
                self.executions.retain(|_, e| &e.task_id != id);
            }
            Operation::ExecutionSave { execution } => {
                self.executions
                    .insert(execution.id.clone(), execution.clone());
            }
            Operation::ExecutionDelete { id } => {
                self.executions.remove(id);
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
