// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution engine: runs one task and records the outcome

use crate::error::EngineError;
use crate::context::notify_context;
use chrono::{DateTime, Utc};
use qs_adapters::{
    CommandRunner, Invocation, NotifyAdapter, OutputBuffer, RunnerError, TemplateKind,
};
use qs_core::{
    parse_next_run_directive, saturating_add, Clock, DirectiveError, Execution, ExecutionStatus,
    IdGen, RepoError, SchedulerConfig, Task, TaskRepository,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a run ended in `error`
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("{0}")]
    Command(#[from] RunnerError),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("{0}")]
    Directive(#[from] DirectiveError),
}

/// Engine adapter dependencies
pub struct EngineDeps<R, X, N> {
    pub repo: R,
    pub runner: X,
    pub notify: N,
}

/// Runs tasks through a [`CommandRunner`] and keeps their execution
/// records and schedules up to date
pub struct ExecutionEngine<R, X, N, C: Clock, I: IdGen> {
    repo: R,
    runner: X,
    notify: N,
    clock: C,
    id_gen: I,
    config: Arc<SchedulerConfig>,
    host: String,
}

impl<R, X, N, C, I> ExecutionEngine<R, X, N, C, I>
where
    R: TaskRepository,
    X: CommandRunner,
    N: NotifyAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(
        deps: EngineDeps<R, X, N>,
        clock: C,
        id_gen: I,
        config: Arc<SchedulerConfig>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            repo: deps.repo,
            runner: deps.runner,
            notify: deps.notify,
            clock,
            id_gen,
            config,
            host: host.into(),
        }
    }

    /// Run `task` once.
    ///
    /// A failing, timed-out, or misbehaving program is recorded on the
    /// returned execution and the task is rescheduled; only repository
    /// errors are returned as `Err`.
    pub async fn run(&self, task: &Task) -> Result<Execution, EngineError> {
        let mut execution = Execution::new(self.id_gen.next(), task.id.clone(), self.clock.now());
        self.repo.save_execution(&execution)?;
        execution.status = ExecutionStatus::Ongoing;
        self.repo.save_execution(&execution)?;

        let interval = task.effective_interval(self.config.default_repeat_interval_s);
        let invocation = Invocation::new(
            task.command.clone(),
            task.argument_list(),
            interval.num_seconds().max(0) as u64,
        );
        let output = OutputBuffer::with_limit(self.config.max_output_bytes);

        let outcome = match task.effective_max_duration(self.config.default_max_duration_s) {
            Some(secs) => {
                match tokio::time::timeout(
                    Duration::from_secs(secs),
                    self.runner.run(&invocation, &output),
                )
                .await
                {
                    Ok(result) => result.map_err(RunFailure::from),
                    Err(_) => Err(RunFailure::Timeout(secs)),
                }
            }
            None => self
                .runner
                .run(&invocation, &output)
                .await
                .map_err(RunFailure::from),
        };

        execution.output = output.contents();
        let now = self.clock.now();
        let outcome = outcome
            .and_then(|()| parse_next_run_directive(&execution.output).map_err(RunFailure::from));

        let next_run = match outcome {
            Ok(directive) => {
                // A kill recorded while we ran takes precedence
                let status = match self.repo.get_execution(&execution.id) {
                    Ok(Some(stored)) if stored.status != ExecutionStatus::Ongoing => stored.status,
                    Ok(_) => ExecutionStatus::Success,
                    Err(e) => {
                        tracing::warn!(
                            execution_id = %execution.id,
                            error = %e,
                            "could not reload execution"
                        );
                        ExecutionStatus::Success
                    }
                };
                execution.finish(status, now);

                if execution.output.trim().is_empty() {
                    tracing::warn!(task_id = %task.id, "no output; task is not scheduler-aware");
                }
                match directive {
                    Some(at) => {
                        tracing::debug!(task_id = %task.id, next_run = %at, "task chose its next run");
                        at
                    }
                    None => saturating_add(execution.started, interval),
                }
            }
            Err(failure) => {
                tracing::error!(task_id = %task.id, error = %failure, "execution failed");
                if !execution.output.is_empty() && !execution.output.ends_with('\n') {
                    execution.output.push('\n');
                }
                execution.output.push_str(&format!("error: {failure}\n"));
                execution.finish(ExecutionStatus::Error, now);
                saturating_add(now, interval)
            }
        };

        // Closed before the schedule is touched
        match self.repo.save_execution(&execution) {
            Err(RepoError::NotFound { .. }) => {
                tracing::warn!(task_id = %task.id, "task deleted while running");
                return Ok(execution);
            }
            closed => closed?,
        }
        let task = self.reschedule(task, next_run)?;

        tracing::info!(
            task_id = %task.id,
            execution_id = %execution.id,
            status = %execution.status,
            runtime_s = execution.total_runtime.unwrap_or_default(),
            next_run = ?task.next_run,
            "execution finished"
        );
        Ok(execution)
    }

    /// Store the next run on the latest copy of `task`; alert bookkeeping
    /// may have touched it while the program ran
    fn reschedule(&self, task: &Task, next_run: DateTime<Utc>) -> Result<Task, EngineError> {
        let mut task = match self.repo.get_task(&task.id)? {
            Some(latest) => latest,
            None => return Ok(task.clone()),
        };
        task.next_run = Some(next_run);
        self.repo.save_task(&task)?;
        Ok(task)
    }

    /// Kill an open execution that cannot legitimately still be running.
    ///
    /// Executions started before `queue_start` belong to a previous
    /// scheduler instance. Others are killed once they exceed the task's
    /// max duration. Returns whether the execution was killed; a closed
    /// execution is left alone.
    pub async fn kill_if_stuck(
        &self,
        execution: &mut Execution,
        queue_start: Option<DateTime<Utc>>,
    ) -> Result<bool, EngineError> {
        if !execution.is_open() {
            return Ok(false);
        }
        let now = self.clock.now();

        if queue_start.is_some_and(|start| execution.started < start) {
            self.kill(execution, now, TemplateKind::ExecutionStaleKilled)
                .await?;
            return Ok(true);
        }

        let default = self.config.default_max_duration_s;
        let max_duration = match self.repo.get_task(&execution.task_id)? {
            Some(task) => task.effective_max_duration(default),
            None => default,
        };
        if let Some(max) = max_duration {
            if execution.runtime(now) > max as f64 {
                self.kill(execution, now, TemplateKind::ExecutionExceededMaxDuration)
                    .await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runtime in seconds; cached once the execution has ended
    pub fn runtime(&self, execution: &mut Execution) -> f64 {
        execution.runtime(self.clock.now())
    }

    async fn kill(
        &self,
        execution: &mut Execution,
        now: DateTime<Utc>,
        kind: TemplateKind,
    ) -> Result<(), EngineError> {
        execution.finish(ExecutionStatus::Killed, now);
        self.repo.save_execution(execution)?;
        tracing::warn!(
            execution_id = %execution.id,
            task_id = %execution.task_id,
            reason = %kind,
            "killed execution"
        );

        let task = self.repo.get_task(&execution.task_id)?;
        let mut context = notify_context(task.as_ref(), &self.host);
        context.insert("task_id".into(), execution.task_id.to_string().into());
        context.insert("execution".into(), serde_json::to_value(&*execution).unwrap_or_default());
        if let Err(e) = self.notify.notify(kind, &context).await {
            tracing::warn!(error = %e, "failed to send kill notification");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
