// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};

#[test]
fn operations_serialize_with_variant_tag() {
    let op = Operation::TaskDelete {
        id: TaskId::from("t-1"),
    };
    let json = serde_json::to_string(&op).unwrap();
    assert_eq!(json, r#"{"TaskDelete":{"id":"t-1"}}"#);
}

#[test]
fn legacy_task_without_optional_fields_deserializes() {
    let json = r#"{"TaskSave":{"task":{"id":"t-1","command":"ping","queue":"default"}}}"#;
    let op: Operation = serde_json::from_str(json).unwrap();
    let Operation::TaskSave { task } = op else {
        panic!("expected TaskSave");
    };
    assert_eq!(task.repeat_interval, 0);
    assert!(task.next_run.is_none());
    assert!(task.arguments.is_empty());
}

#[test]
fn execution_save_keeps_timestamps() {
    let started = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let execution = Execution::new("e-1", TaskId::from("t-1"), started);
    let op = Operation::ExecutionSave { execution };
    let back: Operation = serde_json::from_str(&serde_json::to_string(&op).unwrap()).unwrap();
    assert_eq!(back, op);
    assert_eq!(back.name(), "execution:save");
}
