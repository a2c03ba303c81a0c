// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed task repository
//!
//! Every call takes the WAL lock, folds in operations other processes
//! appended since the last call, and (for writes) appends its own. Reads
//! therefore observe every write that completed before they started, in
//! this process or any other.

use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use qs_core::{
    Execution, ExecutionFilter, ExecutionId, Operation, RepoError, Task, TaskId, TaskRepository,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

struct Inner {
    /// `None` for in-memory stores
    wal: Option<Wal>,
    state: MaterializedState,
}

impl Inner {
    /// Run `f` against caught-up state while holding the WAL lock.
    /// Operations it returns are appended and applied.
    ///
    /// Writes that delete anything are followed by a compaction, as is any
    /// write that leaves the log well past its compacted size.
    fn transact<T>(
        &mut self,
        f: impl FnOnce(&MaterializedState) -> Result<(T, Vec<Operation>), RepoError>,
    ) -> Result<T, RepoError> {
        let Some(wal) = self.wal.as_mut() else {
            let (value, ops) = f(&self.state)?;
            for op in &ops {
                self.state.apply(op);
            }
            return Ok(value);
        };

        let mut lock = wal.lock().map_err(RepoError::backend)?;
        if wal.take_replaced() {
            self.state = MaterializedState::default();
        }
        for op in wal.read_new().map_err(RepoError::backend)? {
            self.state.apply(&op);
        }

        let (value, ops) = f(&self.state)?;

        for op in &ops {
            wal.append(op).map_err(RepoError::backend)?;
            tracing::trace!(op = op.name(), "applied");
            self.state.apply(op);
        }

        let pruned = ops.iter().any(|op| {
            matches!(
                op,
                Operation::TaskDelete { .. } | Operation::ExecutionDelete { .. }
            )
        });
        if pruned || wal.needs_compaction() {
            if let Err(e) = wal.compact(&mut lock, &self.state.snapshot_ops()) {
                tracing::warn!(error = %e, "WAL compaction failed");
            }
        }
        Ok(value)
    }

    fn read<T>(&mut self, f: impl FnOnce(&MaterializedState) -> T) -> Result<T, RepoError> {
        self.transact(|state| Ok((f(state), Vec::new())))
    }
}

/// Durable [`TaskRepository`] over a JSON-lines write-ahead log
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Open the store at `path`, replaying whatever is already there
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut wal = Wal::open(path)?;
        let mut state = MaterializedState::default();
        {
            let _lock = wal.lock()?;
            wal.take_replaced();
            for op in wal.read_new()? {
                state.apply(&op);
            }
        }
        tracing::debug!(
            path = %path.display(),
            tasks = state.tasks.len(),
            executions = state.executions.len(),
            "store opened"
        );
        Ok(Self {
            inner: Mutex::new(Inner {
                wal: Some(wal),
                state,
            }),
        })
    }

    /// A store that lives only as long as this value
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                wal: None,
                state: MaterializedState::default(),
            }),
        }
    }

    /// Resolve a task by exact id or unique prefix
    pub fn find_task(&self, id: &str) -> Result<Option<Task>, RepoError> {
        self.lock()?.read(|s| s.get_task(id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, RepoError> {
        self.inner
            .lock()
            .map_err(|_| RepoError::backend(PoisonedStore))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("store mutex poisoned")]
struct PoisonedStore;

impl TaskRepository for Store {
    fn save_task(&self, task: &Task) -> Result<(), RepoError> {
        let op = Operation::TaskSave { task: task.clone() };
        self.lock()?.transact(|_| Ok(((), vec![op])))
    }

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, RepoError> {
        self.lock()?.read(|s| s.tasks.get(id).cloned())
    }

    fn delete_task(&self, id: &TaskId) -> Result<bool, RepoError> {
        self.lock()?.transact(|s| {
            if !s.tasks.contains_key(id) {
                return Ok((false, Vec::new()));
            }
            Ok((true, vec![Operation::TaskDelete { id: id.clone() }]))
        })
    }

    fn tasks(&self, queue: Option<&str>) -> Result<Vec<Task>, RepoError> {
        self.lock()?.read(|s| {
            s.tasks
                .values()
                .filter(|t| queue.is_none_or(|q| t.queue == q))
                .cloned()
                .collect()
        })
    }

    fn due_tasks(&self, queue: Option<&str>, now: DateTime<Utc>) -> Result<Vec<Task>, RepoError> {
        let mut due = self.tasks(queue)?;
        due.retain(|t| t.is_due(now));
        due.sort_by(|a, b| a.next_run.cmp(&b.next_run).then_with(|| a.id.cmp(&b.id)));
        Ok(due)
    }

    fn save_execution(&self, execution: &Execution) -> Result<(), RepoError> {
        let op = Operation::ExecutionSave {
            execution: execution.clone(),
        };
        self.lock()?.transact(|s| {
            if !s.tasks.contains_key(&execution.task_id) {
                return Err(RepoError::NotFound {
                    kind: "task",
                    id: execution.task_id.to_string(),
                });
            }
            Ok(((), vec![op]))
        })
    }

    fn get_execution(&self, id: &ExecutionId) -> Result<Option<Execution>, RepoError> {
        self.lock()?.read(|s| s.executions.get(id).cloned())
    }

    fn executions(&self, task_id: &TaskId) -> Result<Vec<Execution>, RepoError> {
        self.lock()?
            .read(|s| s.executions_of(task_id).into_iter().cloned().collect())
    }

    fn delete_executions(&self, filter: &ExecutionFilter) -> Result<usize, RepoError> {
        self.lock()?.transact(|s| {
            let ops: Vec<Operation> = s
                .executions
                .values()
                .filter(|e| filter.matches(e, s.tasks.get(&e.task_id)))
                .map(|e| Operation::ExecutionDelete { id: e.id.clone() })
                .collect();
            Ok((ops.len(), ops))
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
