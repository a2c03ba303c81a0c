// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for task administration

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn help_lists_commands() {
    let env = TestEnv::new();
    env.qs()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run-queue"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("task"))
        .stdout(predicate::str::contains("clear"));
}

#[test]
fn add_then_list_and_show() {
    let env = TestEnv::new();
    let added = env.json(&[
        "task",
        "add",
        "sh",
        "--id",
        "hello",
        "--arg",
        "-c",
        "--arg",
        "echo hi there",
        "--queue",
        "reports",
        "--repeat-interval",
        "60",
        "--max-duration",
        "30",
    ]);
    assert_eq!(added["id"], "hello");
    assert_eq!(added["queue"], "reports");
    assert_eq!(added["repeat_interval"], 60);
    assert_eq!(added["max_duration"], 30);
    assert_eq!(added["arguments"], "-c\necho hi there");
    assert!(added["next_run"].is_string());

    let listed = env.json(&["task", "list", "--queue", "reports"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let other = env.json(&["task", "list", "--queue", "default"]);
    assert!(other.as_array().unwrap().is_empty());

    let shown = env.json(&["task", "show", "hel"]);
    assert_eq!(shown["id"], "hello");
    assert!(shown["executions"].as_array().unwrap().is_empty());
}

#[test]
fn duplicate_id_is_rejected() {
    let env = TestEnv::new();
    env.qs()
        .args(["task", "add", "true", "--id", "once"])
        .assert()
        .success();
    env.qs()
        .args(["task", "add", "true", "--id", "once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn schedule_never_and_back() {
    let env = TestEnv::new();
    env.qs()
        .args(["task", "add", "true", "--id", "idle"])
        .assert()
        .success();

    env.qs()
        .args(["task", "schedule", "idle", "--at", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("will not run"));
    let shown = env.json(&["task", "show", "idle"]);
    assert!(shown["next_run"].is_null());

    env.qs()
        .args(["task", "schedule", "idle", "--at", "2030-01-01T00:00:00Z"])
        .assert()
        .success();
    let shown = env.json(&["task", "show", "idle"]);
    assert_eq!(shown["next_run"], "2030-01-01T00:00:00Z");
}

#[test]
fn remove_deletes_task() {
    let env = TestEnv::new();
    env.qs()
        .args(["task", "add", "true", "--id", "gone"])
        .assert()
        .success();
    env.qs()
        .args(["task", "remove", "gone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed task gone"));
    env.qs()
        .args(["task", "show", "gone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no task matches"));
}

#[test]
fn invalid_next_run_fails() {
    let env = TestEnv::new();
    env.qs()
        .args(["task", "add", "true", "--next-run", "soonish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timestamp"));
}

#[test]
fn out_of_range_interval_is_rejected() {
    let env = TestEnv::new();
    env.qs()
        .args([
            "task",
            "add",
            "true",
            "--repeat-interval",
            "9223372036854775807",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--repeat-interval"));
    env.qs()
        .args(["task", "add", "true", "--max-duration", "18446744073709551615"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-duration"));

    let listed = env.json(&["task", "list"]);
    assert!(listed.as_array().unwrap().is_empty());
}
