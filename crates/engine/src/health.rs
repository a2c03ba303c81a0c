// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health and alert evaluation
//!
//! Decides when a task deserves an operator's attention, sends the alert,
//! and debounces repeats through `postpone_alert_until`.

use crate::context::notify_context;
use crate::error::EngineError;
use qs_adapters::{NotifyAdapter, TemplateKind};
use qs_core::stats::DEFAULT_STDDEV_MULTIPLIER;
use qs_core::{
    saturating_add, Clock, Execution, RuntimeStats, SchedulerConfig, Task, TaskRepository,
};
use serde::Serialize;
use std::sync::Arc;

/// Open executions shorter than this are reported as "overdue" rather
/// than "running long"
const RUNNING_LONG_NOISE_FLOOR_S: f64 = 10.0;

/// Less history than this is too thin to judge a task by
const MIN_HISTORY_RUNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HealthIssue {
    /// Idle for longer than its schedule and history explain
    Overdue {
        task: String,
        outlier_threshold: f64,
        overdue: f64,
    },
    /// Too little history to judge
    TooFewRuns { task: String, issue: String },
}

/// Queue health, serialized as `{"status": ..., "issues": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<HealthIssue>,
}

impl HealthReport {
    pub fn from_issues(issues: Vec<HealthIssue>) -> Self {
        let status = if issues.is_empty() {
            HealthStatus::Ok
        } else {
            HealthStatus::Error
        };
        Self { status, issues }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

pub struct HealthEvaluator<R, N, C> {
    repo: R,
    notify: N,
    clock: C,
    config: Arc<SchedulerConfig>,
    host: String,
}

impl<R, N, C> HealthEvaluator<R, N, C>
where
    R: TaskRepository,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(
        repo: R,
        notify: N,
        clock: C,
        config: Arc<SchedulerConfig>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            notify,
            clock,
            config,
            host: host.into(),
        }
    }

    /// Mean and spread of the task's completed runtimes
    pub fn runtime_stats(&self, task: &Task) -> Result<Option<RuntimeStats>, EngineError> {
        let now = self.clock.now();
        let runtimes: Vec<f64> = self
            .repo
            .executions(&task.id)?
            .iter()
            .filter(|e| !e.is_open())
            .map(|e| e.runtime_at(now))
            .collect();
        Ok(RuntimeStats::from_runtimes(&runtimes))
    }

    /// `mean + multiplier * stddev` over completed runtimes, once there
    /// are more than five of them
    pub fn runtime_outlier_threshold(
        &self,
        task: &Task,
        multiplier: f64,
    ) -> Result<Option<f64>, EngineError> {
        Ok(self
            .runtime_stats(task)?
            .and_then(|stats| stats.outlier_threshold(multiplier)))
    }

    pub fn should_alert(&self, task: &Task) -> Result<bool, EngineError> {
        let now = self.clock.now();
        if task.alerts_postponed(now) {
            return Ok(false);
        }

        let open = self.oldest_open(task)?;
        let threshold = self.runtime_outlier_threshold(task, DEFAULT_STDDEV_MULTIPLIER)?;

        if let Some(open) = open {
            let runtime = open.runtime_at(now);
            if threshold.is_some_and(|t| runtime > t) {
                tracing::debug!(task_id = %task.id, runtime, ?threshold, "runtime outlier");
                return Ok(true);
            }
            if self.repo.count_completed(&task.id)? < MIN_HISTORY_RUNS {
                return Ok(true);
            }
            let floor = self.config.min_task_alert_runtime_s as f64;
            let over_ceiling = self
                .config
                .max_task_runtime_s
                .is_some_and(|ceiling| runtime > ceiling as f64);
            return Ok(runtime > floor && over_ceiling);
        }

        let grace = self.config.overdue_grace();
        if task.next_run.is_some_and(|at| now - at > grace) {
            // A busy queue delays everyone; that is not this task's fault
            return Ok(!self.repo.others_running(task)?);
        }
        Ok(false)
    }

    /// Notify about `task`, then postpone further alerts for it
    pub async fn alert(&self, task: &Task) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut task = self.repo.get_task(&task.id)?.unwrap_or_else(|| task.clone());
        let open = self.oldest_open(&task)?;
        let stats = self.runtime_stats(&task)?;

        let mut context = notify_context(Some(&task), &self.host);
        if let Some(stats) = stats {
            context.insert("mean".into(), stats.mean.into());
            context.insert("stddev".into(), stats.stddev.into());
        }
        context.insert(
            "completed".into(),
            self.repo.count_completed(&task.id)?.into(),
        );
        context.insert("ongoing".into(), self.repo.count_ongoing(&task.id)?.into());

        let kind = match &open {
            Some(exec) if exec.runtime_at(now) > RUNNING_LONG_NOISE_FLOOR_S => {
                context.insert("runtime".into(), exec.runtime_at(now).into());
                context.insert(
                    "execution".into(),
                    serde_json::to_value(exec).unwrap_or_default(),
                );
                TemplateKind::TaskRunningLong
            }
            _ => TemplateKind::TaskOverdueNeverStarted,
        };

        self.notify.notify(kind, &context).await?;
        tracing::warn!(task_id = %task.id, template = %kind, "alert sent");

        task.postpone_alert_until = Some(saturating_add(now, self.config.alert_interval()));
        self.repo.save_task(&task)?;
        Ok(())
    }

    /// Alert when warranted; returns whether an alert went out
    pub async fn check(&self, task: &Task) -> Result<bool, EngineError> {
        if !self.should_alert(task)? {
            return Ok(false);
        }
        self.alert(task).await?;
        Ok(true)
    }

    /// Scan due tasks (in one queue, or all of them) and report issues.
    ///
    /// Scanning also runs the alert policy on every task it visits.
    pub async fn report(&self, queue: Option<&str>) -> Result<HealthReport, EngineError> {
        let now = self.clock.now();
        let mut issues = Vec::new();

        for task in self.repo.due_tasks(queue, now)? {
            let recorded = self.repo.executions(&task.id)?.len();
            if recorded < MIN_HISTORY_RUNS {
                issues.push(HealthIssue::TooFewRuns {
                    task: task.id.to_string(),
                    issue: format!("Only {recorded} runs recorded."),
                });
            } else if !self.repo.is_running(&task.id)? {
                if let Some(issue) = self.overdue_issue(&task)? {
                    issues.push(issue);
                }
            }

            if let Err(e) = self.check(&task).await {
                tracing::warn!(task_id = %task.id, error = %e, "alert check failed");
            }
        }

        Ok(HealthReport::from_issues(issues))
    }

    fn overdue_issue(&self, task: &Task) -> Result<Option<HealthIssue>, EngineError> {
        let Some(ended) = self.repo.last_completed(&task.id)?.and_then(|e| e.ended) else {
            return Ok(None);
        };
        let Some(threshold) = self.runtime_outlier_threshold(task, DEFAULT_STDDEV_MULTIPLIER)?
        else {
            return Ok(None);
        };

        let since = (self.clock.now() - ended).num_milliseconds() as f64 / 1000.0;
        let allowed = 2.0 * task.repeat_interval as f64 + threshold;
        if since <= allowed || self.repo.others_running(task)? {
            return Ok(None);
        }
        Ok(Some(HealthIssue::Overdue {
            task: task.id.to_string(),
            outlier_threshold: threshold,
            overdue: since,
        }))
    }

    fn oldest_open(&self, task: &Task) -> Result<Option<Execution>, EngineError> {
        Ok(self.repo.open_executions(&task.id)?.into_iter().next())
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
