// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

#[test]
fn new_task_is_unscheduled_in_default_queue() {
    let task = Task::new("t-1", "backup");
    assert_eq!(task.queue, DEFAULT_QUEUE);
    assert!(task.next_run.is_none());
    assert!(!task.is_due(t0()));
}

#[test]
fn task_is_due_at_and_after_next_run() {
    let task = Task::new("t-1", "backup").scheduled_at(t0());
    assert!(!task.is_due(t0() - Duration::seconds(1)));
    assert!(task.is_due(t0()));
    assert!(task.is_due(t0() + Duration::seconds(1)));
}

#[parameterized(
    empty = { "", &[] },
    blank_lines = { "\n  \n", &[] },
    whitespace_line = { "--verbose --limit 10", &["--verbose", "--limit", "10"] },
    one_per_line = { "-c\nsleep 10", &["-c", "sleep 10"] },
    trims_lines = { "  --no-color  \n\n --quiet\n", &["--no-color", "--quiet"] },
)]
fn arguments_are_split(text: &str, expected: &[&str]) {
    assert_eq!(split_arguments(text), expected);
}

#[test]
fn effective_interval_falls_back_below_one_second() {
    let task = Task::new("t-1", "backup");
    assert_eq!(task.effective_interval(5), Duration::seconds(5));

    let task = task.every(60);
    assert_eq!(task.effective_interval(5), Duration::seconds(60));

    let task = Task::new("t-2", "backup").every(-3);
    assert_eq!(task.effective_interval(5), Duration::seconds(5));
}

#[test]
fn effective_interval_saturates_instead_of_panicking() {
    let task = Task::new("t-1", "backup").every(i64::MAX);
    assert_eq!(task.effective_interval(5), Duration::MAX);

    let task = Task::new("t-2", "backup");
    assert_eq!(task.effective_interval(u64::MAX), Duration::MAX);
}

#[test]
fn effective_max_duration_prefers_task_value() {
    let task = Task::new("t-1", "backup");
    assert_eq!(task.effective_max_duration(None), None);
    assert_eq!(task.effective_max_duration(Some(30)), Some(30));
    assert_eq!(task.with_max_duration(2).effective_max_duration(Some(30)), Some(2));
}

#[test]
fn alerts_postponed_only_while_in_future() {
    let mut task = Task::new("t-1", "backup");
    assert!(!task.alerts_postponed(t0()));

    task.postpone_alert_until = Some(t0() + Duration::minutes(15));
    assert!(task.alerts_postponed(t0()));
    assert!(!task.alerts_postponed(t0() + Duration::minutes(15)));
}

#[test]
fn display_shows_command_queue_and_arguments() {
    let task = Task::new("t-1", "sync_users")
        .in_queue("slow")
        .with_arguments("--no-color\n--full");
    assert_eq!(task.to_string(), "sync_users[slow] --no-color --full");
    assert_eq!(Task::new("t-2", "ping").to_string(), "ping[default]");
}
