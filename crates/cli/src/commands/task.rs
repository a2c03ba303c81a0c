// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task administration commands

use super::{parse_when, Context};
use crate::output::{print, print_list, OutputFormat};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use qs_core::{
    Execution, IdGen, Task, TaskId, TaskRepository, UuidIdGen, DEFAULT_QUEUE, MAX_INTERVAL_S,
};
use serde::Serialize;
use std::fmt;

/// Executions listed by `task show`
const RECENT_EXECUTIONS: usize = 10;

#[derive(clap::Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Register a recurring task
    Add {
        /// Program to run
        command: String,
        /// Argument passed to the program (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Task id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Queue the task runs on
        #[arg(long, default_value = DEFAULT_QUEUE)]
        queue: String,
        /// Seconds between runs
        #[arg(
            long,
            default_value = "0",
            value_parser = clap::value_parser!(i64).range(..=MAX_INTERVAL_S)
        )]
        repeat_interval: i64,
        /// Hard timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_INTERVAL_S as u64))]
        max_duration: Option<u64>,
        /// First run: `now` or an RFC 3339 timestamp
        #[arg(long, default_value = "now")]
        next_run: String,
        #[arg(short = 'o', long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
    /// List tasks
    List {
        #[arg(long)]
        queue: Option<String>,
        #[arg(short = 'o', long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
    /// Show a task and its recent executions
    Show {
        /// Task id or unique prefix
        id: String,
        #[arg(short = 'o', long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
    /// Delete a task and its execution history
    Remove {
        /// Task id or unique prefix
        id: String,
    },
    /// Change when a task next runs
    Schedule {
        /// Task id or unique prefix
        id: String,
        /// `now`, an RFC 3339 timestamp, or `never`
        #[arg(long)]
        at: String,
    },
}

#[derive(Serialize)]
struct TaskInfo<'a> {
    #[serde(flatten)]
    task: &'a Task,
}

impl fmt::Display for TaskInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next_run = match self.task.next_run {
            Some(at) => at.to_rfc3339(),
            None => "never".to_string(),
        };
        write!(
            f,
            "{:<36} {:<12} every={:<6} next={:<25} {}",
            self.task.id.as_str(),
            self.task.queue,
            format!("{}s", self.task.repeat_interval),
            next_run,
            self.task
        )
    }
}

#[derive(Serialize)]
struct TaskDetail {
    #[serde(flatten)]
    task: Task,
    executions: Vec<Execution>,
}

impl fmt::Display for TaskDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = &self.task;
        writeln!(f, "Task:      {}", task.id)?;
        writeln!(f, "Command:   {}", task)?;
        writeln!(f, "Queue:     {}", task.queue)?;
        writeln!(f, "Interval:  {}s", task.repeat_interval)?;
        if let Some(secs) = task.max_duration {
            writeln!(f, "Timeout:   {}s", secs)?;
        }
        match task.next_run {
            Some(at) => writeln!(f, "Next run:  {}", at.to_rfc3339())?,
            None => writeln!(f, "Next run:  never")?,
        }
        if let Some(until) = task.postpone_alert_until {
            writeln!(f, "Alerts:    postponed until {}", until.to_rfc3339())?;
        }

        if self.executions.is_empty() {
            write!(f, "\nNo executions recorded.")?;
            return Ok(());
        }
        write!(f, "\nRecent executions:")?;
        for execution in &self.executions {
            let runtime = execution
                .total_runtime
                .map(|secs| format!("{secs:.1}s"))
                .unwrap_or_else(|| "-".to_string());
            write!(
                f,
                "\n  {:<36} {:<8} {} {:>8}",
                execution.id.as_str(),
                execution.status.to_string(),
                execution.started.to_rfc3339(),
                runtime
            )?;
        }
        Ok(())
    }
}

pub fn handle(ctx: &Context, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Add {
            command,
            args,
            id,
            queue,
            repeat_interval,
            max_duration,
            next_run,
            output,
        } => {
            let next_run = parse_when(&next_run, Utc::now())?;
            let id = id.unwrap_or_else(|| UuidIdGen.next());
            if ctx.store.get_task(&TaskId::from(id.as_str()))?.is_some() {
                bail!("task {id} already exists");
            }

            let mut task = Task::new(id, command)
                .with_arguments(args.join("\n"))
                .in_queue(queue)
                .every(repeat_interval)
                .scheduled_at(next_run);
            if let Some(secs) = max_duration {
                task = task.with_max_duration(secs);
            }
            ctx.store.save_task(&task)?;
            tracing::info!(task_id = %task.id, queue = %task.queue, "task added");
            print(&TaskInfo { task: &task }, output)?;
            Ok(())
        }
        TaskCommand::List { queue, output } => {
            let tasks = ctx.store.tasks(queue.as_deref())?;
            if tasks.is_empty() && matches!(output, OutputFormat::Text) {
                println!("No tasks.");
                return Ok(());
            }
            let infos: Vec<_> = tasks.iter().map(|task| TaskInfo { task }).collect();
            print_list(&infos, output)?;
            Ok(())
        }
        TaskCommand::Show { id, output } => {
            let task = resolve(ctx, &id)?;
            let mut executions = ctx.store.executions(&task.id)?;
            let skip = executions.len().saturating_sub(RECENT_EXECUTIONS);
            executions.drain(..skip);
            print(&TaskDetail { task, executions }, output)?;
            Ok(())
        }
        TaskCommand::Remove { id } => {
            let task = resolve(ctx, &id)?;
            ctx.store.delete_task(&task.id)?;
            println!("Removed task {}", task.id);
            Ok(())
        }
        TaskCommand::Schedule { id, at } => {
            let mut task = resolve(ctx, &id)?;
            task.next_run = schedule_target(&at, Utc::now())?;
            ctx.store.save_task(&task)?;
            match task.next_run {
                Some(at) => println!("Task {} next runs at {}", task.id, at.to_rfc3339()),
                None => println!("Task {} will not run until rescheduled", task.id),
            }
            Ok(())
        }
    }
}

fn resolve(ctx: &Context, id: &str) -> Result<Task> {
    match ctx.store.find_task(id)? {
        Some(task) => Ok(task),
        None => bail!("no task matches {id}"),
    }
}

/// `never` clears the schedule; anything else goes through [`parse_when`]
fn schedule_target(text: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    if text.eq_ignore_ascii_case("never") {
        return Ok(None);
    }
    parse_when(text, now).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn schedule_never_clears_next_run() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(schedule_target("never", now).unwrap(), None);
        assert_eq!(schedule_target("now", now).unwrap(), Some(now));
        assert!(schedule_target("later", now).is_err());
    }

    #[test]
    fn task_info_shows_schedule() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let task = Task::new("backup", "pg_dump")
            .with_arguments("--clean\nmain")
            .in_queue("nightly")
            .every(3600)
            .scheduled_at(at);
        let line = TaskInfo { task: &task }.to_string();
        assert!(line.starts_with("backup"));
        assert!(line.contains("nightly"));
        assert!(line.contains("every=3600s"));
        assert!(line.contains("2026-03-01T12:00:00+00:00"));
        assert!(line.ends_with("pg_dump[nightly] --clean main"));
    }

    #[test]
    fn task_detail_without_history() {
        let task = Task::new("t1", "true");
        let text = TaskDetail {
            task,
            executions: vec![],
        }
        .to_string();
        assert!(text.contains("Next run:  never"));
        assert!(text.ends_with("No executions recorded."));
    }
}
