// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler loop for one queue
//!
//! ```text
//! acquire lock -> kill stuck executions -> cycle until deadline or signal
//! ```
//!
//! A cycle dispatches every due task that is not already running, one at
//! a time, and alerts on due tasks that are. The loop exits after
//! `restart_after_minutes` so the process manager starts a fresh one.

use crate::error::EngineError;
use crate::executor::{EngineDeps, ExecutionEngine};
use crate::health::HealthEvaluator;
use crate::lock::{with_instance_lock, InstanceLock, LockHandle};
use chrono::{DateTime, Utc};
use qs_adapters::{CommandRunner, NotifyAdapter};
use qs_core::{Clock, IdGen, SchedulerConfig, TaskRepository};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

/// What one cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub due: usize,
    pub dispatched: usize,
    pub alerted: usize,
}

pub struct SchedulerLoop<R, X, N, C: Clock, I: IdGen> {
    queue: String,
    repo: R,
    clock: C,
    config: Arc<SchedulerConfig>,
    engine: ExecutionEngine<R, X, N, C, I>,
    health: HealthEvaluator<R, N, C>,
}

impl<R, X, N, C, I> SchedulerLoop<R, X, N, C, I>
where
    R: TaskRepository + Clone,
    X: CommandRunner,
    N: NotifyAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(
        queue: impl Into<String>,
        deps: EngineDeps<R, X, N>,
        clock: C,
        id_gen: I,
        config: Arc<SchedulerConfig>,
        host: impl Into<String>,
    ) -> Self {
        let host = host.into();
        let health = HealthEvaluator::new(
            deps.repo.clone(),
            deps.notify.clone(),
            clock.clone(),
            config.clone(),
            host.clone(),
        );
        let repo = deps.repo.clone();
        Self {
            queue: queue.into(),
            repo,
            clock: clock.clone(),
            config: config.clone(),
            engine: ExecutionEngine::new(deps, clock, id_gen, config, host),
            health,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn engine(&self) -> &ExecutionEngine<R, X, N, C, I> {
        &self.engine
    }

    pub fn health(&self) -> &HealthEvaluator<R, N, C> {
        &self.health
    }

    /// Name of the instance lock guarding this queue
    pub fn lock_name(&self) -> String {
        format!("run_queue {}", self.queue)
    }

    /// Kill open executions left behind by earlier instances. Returns how
    /// many were killed.
    pub async fn recover(&self, queue_start: DateTime<Utc>) -> Result<usize, EngineError> {
        let mut killed = 0;
        for task in self.repo.tasks(Some(&self.queue))? {
            for mut execution in self.repo.open_executions(&task.id)? {
                if self
                    .engine
                    .kill_if_stuck(&mut execution, Some(queue_start))
                    .await?
                {
                    killed += 1;
                }
            }
        }
        if killed > 0 {
            tracing::warn!(queue = %self.queue, killed, "killed stuck executions");
        }
        Ok(killed)
    }

    /// One pass over the due tasks
    pub async fn cycle(&self) -> Result<CycleSummary, EngineError> {
        let now = self.clock.now();
        let due = self.repo.due_tasks(Some(&self.queue), now)?;
        let mut summary = CycleSummary {
            due: due.len(),
            ..Default::default()
        };

        let mut dispatch = Vec::new();
        for task in due {
            match self.repo.is_running(&task.id) {
                Ok(false) => dispatch.push(task),
                Ok(true) => match self.health.check(&task).await {
                    Ok(true) => summary.alerted += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(task_id = %task.id, error = %e, "alert failed"),
                },
                Err(e) => tracing::error!(task_id = %task.id, error = %e, "running check failed"),
            }
        }

        for task in dispatch {
            tracing::info!(task_id = %task.id, "RUN: {task}");
            match self.engine.run(&task).await {
                Ok(_) => summary.dispatched += 1,
                Err(e) => tracing::error!(task_id = %task.id, error = %e, "dispatch failed"),
            }
        }
        Ok(summary)
    }

    /// Sweep stuck executions and run a single cycle.
    ///
    /// The caller must already hold the queue's instance lock.
    pub async fn run_once(&self) -> Result<CycleSummary, EngineError> {
        self.recover(self.clock.now()).await?;
        self.cycle().await
    }

    /// Run cycles until the restart deadline or until `shutdown` resolves.
    ///
    /// The caller must already hold the queue's instance lock.
    pub async fn run(
        &self,
        lock: Option<&LockHandle>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), EngineError> {
        let started = self.clock.now();
        let began = Instant::now();
        let deadline = began + self.config.restart_after();
        tracing::info!(queue = %self.queue, "scheduler started");

        self.recover(started).await?;
        tokio::pin!(shutdown);

        loop {
            let cycle_start = Instant::now();
            if cycle_start >= deadline {
                tracing::info!(queue = %self.queue, "restart deadline reached");
                break;
            }
            tracing::debug!(queue = %self.queue, "wakeup");

            if let Some(lock) = lock {
                if let Err(e) = lock.touch() {
                    tracing::warn!(error = %e, "failed to touch lock");
                }
            }

            tokio::select! {
                result = self.cycle() => {
                    if let Err(e) = result {
                        tracing::error!(queue = %self.queue, error = %e, "cycle failed");
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!(queue = %self.queue, "interrupted");
                    break;
                }
            }

            let pause = self
                .config
                .sleep_duration()
                .saturating_sub(cycle_start.elapsed())
                .max(self.config.min_cycle_sleep());
            let wake = (Instant::now() + pause).min(deadline);

            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {}
                _ = &mut shutdown => {
                    tracing::info!(queue = %self.queue, "interrupted");
                    break;
                }
            }
        }

        tracing::info!(
            queue = %self.queue,
            "done in {} seconds",
            began.elapsed().as_secs()
        );
        Ok(())
    }

    /// Take the queue lock, then run. Returns `false` when another
    /// instance holds the lock.
    pub async fn run_locked(
        &self,
        lock: &InstanceLock<R, C>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<bool, EngineError> {
        let name = self.lock_name();
        let outcome = with_instance_lock(
            lock,
            &name,
            Some(&self.queue),
            self.config.lock_wait(),
            |handle| async move { self.run(Some(&handle), shutdown).await },
        )
        .await?;

        match outcome {
            Some(result) => result.map(|()| true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
