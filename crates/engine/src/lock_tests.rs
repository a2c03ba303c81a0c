// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use qs_core::{Execution, FakeClock, Task, TaskId};
use qs_storage::Store;
use std::sync::Arc;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn setup() -> (TempDir, Arc<Store>, InstanceLock<Arc<Store>, FakeClock>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::in_memory());
    let lock = InstanceLock::new(dir.path(), Some("Build Host.01"), store.clone(), FakeClock::at(t0()))
        .with_boot_time(None);
    (dir, store, lock)
}

fn ongoing(id: &str, task: &str, started: DateTime<Utc>) -> Execution {
    let mut exec = Execution::new(id, TaskId::from(task), started);
    exec.status = ExecutionStatus::Ongoing;
    exec
}

#[test]
fn slugify_collapses_separators() {
    assert_eq!(slugify("Build Host.01"), "build-host-01");
    assert_eq!(slugify("--run  queue--"), "run-queue");
    assert_eq!(slugify("default"), "default");
    assert_eq!(slugify("ünïcode"), "n-code");
}

#[test]
fn lock_names_combine_host_and_name() {
    let (_dir, _store, lock) = setup();
    assert_eq!(lock.lock_name("run_queue default"), "build-host-01__run-queue-default");
    assert!(lock
        .marker_path()
        .ends_with("build-host-01__startup__.lock"));
}

#[test]
fn btime_is_read_from_proc_stat() {
    let stat = "cpu  1 2 3\nbtime 1704110400\nprocesses 42\n";
    assert_eq!(parse_btime(stat), Some(t0()));
    assert_eq!(parse_btime("cpu 1 2 3\n"), None);
}

#[tokio::test]
async fn acquire_and_release() {
    let (_dir, _store, lock) = setup();

    let handle = lock.acquire("queue-default", None, None).await.unwrap();
    assert!(handle.path().exists());
    handle.touch().unwrap();

    let path = handle.path().to_path_buf();
    handle.release();
    assert!(!path.exists());

    lock.acquire("queue-default", None, None).await.unwrap();
}

#[tokio::test]
async fn held_lock_fails_fast() {
    let (_dir, _store, lock) = setup();
    let _held = lock.acquire("queue-default", None, None).await.unwrap();

    let err = lock.acquire("queue-default", None, None).await.unwrap_err();
    assert!(matches!(err, LockError::AlreadyLocked(_)));
    assert!(err.is_contention());

    // Other names are independent
    lock.acquire("queue-slow", None, None).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn held_lock_times_out_when_waiting() {
    let (_dir, _store, lock) = setup();
    let _held = lock.acquire("queue-default", None, None).await.unwrap();

    let err = lock
        .acquire("queue-default", None, Some(Duration::from_secs(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, LockError::Timeout { .. }));
}

#[tokio::test]
async fn stale_lock_from_previous_boot_is_recovered() {
    let (_dir, store, lock) = setup();
    store.save_task(&Task::new("fast", "ping")).unwrap();
    store.save_task(&Task::new("slow", "ping").in_queue("slow")).unwrap();
    store
        .save_execution(&ongoing("e-old", "fast", t0() - chrono::Duration::hours(2)))
        .unwrap();
    store
        .save_execution(&ongoing("e-other-queue", "slow", t0() - chrono::Duration::hours(2)))
        .unwrap();

    // Marker at t0, lock left behind an hour earlier
    assert_eq!(lock.startup_marker().unwrap(), t0());
    let path = lock.lock_path("run_queue default");
    std::fs::write(&path, format!("{}\n4242\n", (t0() - chrono::Duration::hours(1)).to_rfc3339()))
        .unwrap();

    let handle = lock
        .acquire("run_queue default", Some("default"), None)
        .await
        .unwrap();

    assert_eq!(handle.path(), path.as_path());
    assert!(store
        .get_execution(&"e-old".into())
        .unwrap()
        .is_none());
    assert!(store
        .get_execution(&"e-other-queue".into())
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn abandoned_lock_from_this_boot_is_taken_over() {
    let (_dir, _store, lock) = setup();
    lock.startup_marker().unwrap();

    // Written after the marker but nobody holds the flock
    let path = lock.lock_path("queue-default");
    std::fs::write(&path, format!("{}\n4242\n", t0().to_rfc3339())).unwrap();

    let handle = lock.acquire("queue-default", None, None).await.unwrap();
    assert_eq!(handle.path(), path.as_path());
}

#[tokio::test]
async fn released_lock_file_cannot_be_taken_over() {
    let (_dir, _store, lock) = setup();
    let holder = lock.acquire("queue-default", None, None).await.unwrap();
    let name = holder.name().to_string();
    let path = holder.path().to_path_buf();

    // A peer opens the file while it is held, then the holder lets go
    let stale = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    drop(holder);

    let err = lock.take_over(name, path.clone(), stale).unwrap_err();
    assert!(matches!(err, LockError::AlreadyLocked(_)));
    assert!(!path.exists());

    let next = lock.acquire("queue-default", None, None).await.unwrap();
    assert!(next.path().exists());
}

#[test]
fn marker_older_than_boot_is_replaced() {
    let (dir, store, lock) = setup();
    std::fs::write(
        lock.marker_path(),
        format!("{}\n1\n", (t0() - chrono::Duration::days(3)).to_rfc3339()),
    )
    .unwrap();

    let booted = InstanceLock::new(dir.path(), Some("Build Host.01"), store, FakeClock::at(t0()))
        .with_boot_time(Some(t0() - chrono::Duration::days(1)));
    assert_eq!(booted.startup_marker().unwrap(), t0());

    // Marker newer than boot is kept
    let later = booted.clone();
    assert_eq!(later.startup_marker().unwrap(), t0());
}

#[tokio::test]
async fn with_instance_lock_skips_on_contention() {
    let (_dir, _store, lock) = setup();

    let ran = with_instance_lock(&lock, "clear", None, None, |handle| async move {
        assert!(handle.path().exists());
        42
    })
    .await
    .unwrap();
    assert_eq!(ran, Some(42));

    let _held = lock.acquire("clear", None, None).await.unwrap();
    let skipped = with_instance_lock(&lock, "clear", None, None, |_| async { 42 })
        .await
        .unwrap();
    assert_eq!(skipped, None);
}
