// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository interface over tasks and executions
//!
//! Implementations must be consistent and durable from the point of view
//! of the calling process: a write is visible to the next read.

use crate::execution::{Execution, ExecutionStatus};
use crate::id::{ExecutionId, TaskId};
use crate::task::Task;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepoError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        RepoError::Backend(Box::new(err))
    }
}

/// Selects executions for bulk deletion. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionFilter {
    /// Queue of the owning task
    pub queue: Option<String>,
    pub status: Option<ExecutionStatus>,
    /// `started <= started_before`
    pub started_before: Option<DateTime<Utc>>,
    /// `ended <= ended_before`; open executions never match
    pub ended_before: Option<DateTime<Utc>>,
}

impl ExecutionFilter {
    pub fn matches(&self, execution: &Execution, task: Option<&Task>) -> bool {
        if let Some(queue) = &self.queue {
            if task.map(|t| &t.queue) != Some(queue) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != execution.status) {
            return false;
        }
        if self.started_before.is_some_and(|cutoff| execution.started > cutoff) {
            return false;
        }
        if let Some(cutoff) = self.ended_before {
            match execution.ended {
                Some(ended) if ended <= cutoff => {}
                _ => return false,
            }
        }
        true
    }
}

/// Task and execution storage used by the scheduler
pub trait TaskRepository: Send + Sync + 'static {
    fn save_task(&self, task: &Task) -> Result<(), RepoError>;

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, RepoError>;

    /// Delete a task and all of its executions. Returns whether it existed.
    fn delete_task(&self, id: &TaskId) -> Result<bool, RepoError>;

    /// All tasks, optionally restricted to one queue, ordered by id
    fn tasks(&self, queue: Option<&str>) -> Result<Vec<Task>, RepoError>;

    /// Tasks with `next_run <= now`, earliest first
    fn due_tasks(&self, queue: Option<&str>, now: DateTime<Utc>) -> Result<Vec<Task>, RepoError>;

    fn save_execution(&self, execution: &Execution) -> Result<(), RepoError>;

    fn get_execution(&self, id: &ExecutionId) -> Result<Option<Execution>, RepoError>;

    /// Every execution of a task, oldest first
    fn executions(&self, task_id: &TaskId) -> Result<Vec<Execution>, RepoError>;

    /// Bulk delete; returns how many were removed
    fn delete_executions(&self, filter: &ExecutionFilter) -> Result<usize, RepoError>;

    /// Executions with `ended` unset, oldest first
    fn open_executions(&self, task_id: &TaskId) -> Result<Vec<Execution>, RepoError> {
        Ok(self
            .executions(task_id)?
            .into_iter()
            .filter(Execution::is_open)
            .collect())
    }

    fn count_ongoing(&self, task_id: &TaskId) -> Result<usize, RepoError> {
        Ok(self
            .executions(task_id)?
            .iter()
            .filter(|e| e.status == ExecutionStatus::Ongoing)
            .count())
    }

    /// Executions with `ended` set
    fn count_completed(&self, task_id: &TaskId) -> Result<usize, RepoError> {
        Ok(self
            .executions(task_id)?
            .iter()
            .filter(|e| !e.is_open())
            .count())
    }

    /// A task is running while it has an `ongoing` execution
    fn is_running(&self, task_id: &TaskId) -> Result<bool, RepoError> {
        Ok(self.count_ongoing(task_id)? > 0)
    }

    /// Whether any other task in the same queue is running
    fn others_running(&self, task: &Task) -> Result<bool, RepoError> {
        for other in self.tasks(Some(&task.queue))? {
            if other.id != task.id && self.is_running(&other.id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Most recently ended execution
    fn last_completed(&self, task_id: &TaskId) -> Result<Option<Execution>, RepoError> {
        Ok(self
            .executions(task_id)?
            .into_iter()
            .filter(|e| e.ended.is_some())
            .max_by_key(|e| e.ended))
    }
}

impl<R: TaskRepository + ?Sized> TaskRepository for std::sync::Arc<R> {
    fn save_task(&self, task: &Task) -> Result<(), RepoError> {
        (**self).save_task(task)
    }

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, RepoError> {
        (**self).get_task(id)
    }

    fn delete_task(&self, id: &TaskId) -> Result<bool, RepoError> {
        (**self).delete_task(id)
    }

    fn tasks(&self, queue: Option<&str>) -> Result<Vec<Task>, RepoError> {
        (**self).tasks(queue)
    }

    fn due_tasks(&self, queue: Option<&str>, now: DateTime<Utc>) -> Result<Vec<Task>, RepoError> {
        (**self).due_tasks(queue, now)
    }

    fn save_execution(&self, execution: &Execution) -> Result<(), RepoError> {
        (**self).save_execution(execution)
    }

    fn get_execution(&self, id: &ExecutionId) -> Result<Option<Execution>, RepoError> {
        (**self).get_execution(id)
    }

    fn executions(&self, task_id: &TaskId) -> Result<Vec<Execution>, RepoError> {
        (**self).executions(task_id)
    }

    fn delete_executions(&self, filter: &ExecutionFilter) -> Result<usize, RepoError> {
        (**self).delete_executions(filter)
    }
}
