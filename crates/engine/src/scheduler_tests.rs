// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone};
use qs_adapters::{FakeCommandRunner, FakeNotifyAdapter, FakeResponse, TemplateKind};
use qs_core::{Execution, ExecutionStatus, FakeClock, SequentialIdGen, Task, TaskId};
use qs_storage::Store;

type TestLoop =
    SchedulerLoop<Arc<Store>, FakeCommandRunner, FakeNotifyAdapter, FakeClock, SequentialIdGen>;

struct Harness {
    store: Arc<Store>,
    runner: FakeCommandRunner,
    notify: FakeNotifyAdapter,
    clock: FakeClock,
    scheduler: TestLoop,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn harness_with(config: SchedulerConfig) -> Harness {
    let store = Arc::new(Store::in_memory());
    let runner = FakeCommandRunner::new();
    let notify = FakeNotifyAdapter::new();
    let clock = FakeClock::at(t0());
    let scheduler = SchedulerLoop::new(
        "default",
        EngineDeps {
            repo: store.clone(),
            runner: runner.clone(),
            notify: notify.clone(),
        },
        clock.clone(),
        SequentialIdGen::new("exec"),
        Arc::new(config),
        "test-host",
    );
    Harness {
        store,
        runner,
        notify,
        clock,
        scheduler,
    }
}

fn harness() -> Harness {
    harness_with(SchedulerConfig::default())
}

impl Harness {
    fn add(&self, task: Task) {
        self.store.save_task(&task).unwrap();
    }

    fn commands(&self) -> Vec<String> {
        self.runner.calls().into_iter().map(|c| c.command).collect()
    }

    fn ongoing(&self, id: &str, task: &str, started: DateTime<Utc>) {
        let mut exec = Execution::new(id, TaskId::from(task), started);
        exec.status = ExecutionStatus::Ongoing;
        self.store.save_execution(&exec).unwrap();
    }
}

#[tokio::test]
async fn unscheduled_tasks_are_never_dispatched() {
    let h = harness();
    h.add(Task::new("idle", "idle-cmd"));
    h.add(Task::new("due", "due-cmd").scheduled_at(t0()));

    let summary = h.scheduler.cycle().await.unwrap();

    assert_eq!(summary.due, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(h.commands(), vec!["due-cmd"]);
    assert_eq!(
        h.store.get_task(&TaskId::from("idle")).unwrap().unwrap().next_run,
        None
    );
}

#[tokio::test]
async fn due_tasks_run_earliest_first_and_only_in_this_queue() {
    let h = harness();
    h.add(Task::new("b", "second").scheduled_at(t0() - Duration::seconds(5)));
    h.add(Task::new("a", "first").scheduled_at(t0() - Duration::seconds(50)));
    h.add(Task::new("c", "not-yet").scheduled_at(t0() + Duration::seconds(5)));
    h.add(
        Task::new("d", "elsewhere")
            .in_queue("other")
            .scheduled_at(t0() - Duration::seconds(100)),
    );

    h.scheduler.cycle().await.unwrap();

    assert_eq!(h.commands(), vec!["first", "second"]);
}

#[tokio::test]
async fn running_task_is_not_dispatched_again() {
    let h = harness();
    h.add(Task::new("busy", "busy-cmd").scheduled_at(t0()));
    h.ongoing("e-1", "busy", t0() - Duration::seconds(60));
    assert!(h.store.is_running(&TaskId::from("busy")).unwrap());

    let summary = h.scheduler.cycle().await.unwrap();

    assert_eq!(summary.dispatched, 0);
    assert!(h.runner.calls().is_empty());
    // No history yet, so the open run is worth a look
    assert_eq!(summary.alerted, 1);
    assert_eq!(h.notify.kinds(), vec![TemplateKind::TaskRunningLong]);
}

#[tokio::test]
async fn one_failing_task_does_not_stop_the_cycle() {
    let h = harness();
    h.add(Task::new("a", "broken").scheduled_at(t0() - Duration::seconds(2)));
    h.add(Task::new("b", "fine").scheduled_at(t0() - Duration::seconds(1)));
    h.runner
        .on("broken", FakeResponse::default().failing("segfault"));

    let summary = h.scheduler.cycle().await.unwrap();

    assert_eq!(summary.dispatched, 2);
    assert_eq!(h.commands(), vec!["broken", "fine"]);
    let statuses: Vec<ExecutionStatus> = ["a", "b"]
        .iter()
        .map(|id| h.store.executions(&TaskId::from(*id)).unwrap()[0].status)
        .collect();
    assert_eq!(statuses, vec![ExecutionStatus::Error, ExecutionStatus::Success]);
}

#[tokio::test]
async fn recover_kills_executions_from_before_start() {
    let h = harness();
    h.add(Task::new("a", "cmd"));
    h.ongoing("old", "a", t0() - Duration::minutes(10));
    h.ongoing("new", "a", t0() + Duration::seconds(1));

    let killed = h.scheduler.recover(t0()).await.unwrap();

    assert_eq!(killed, 1);
    let old = h.store.get_execution(&"old".into()).unwrap().unwrap();
    assert_eq!(old.status, ExecutionStatus::Killed);
    let new = h.store.get_execution(&"new".into()).unwrap().unwrap();
    assert!(new.is_open());
    assert_eq!(h.notify.kinds(), vec![TemplateKind::ExecutionStaleKilled]);
}

#[tokio::test(start_paused = true)]
async fn loop_sweeps_then_exits_at_restart_deadline() {
    let h = harness_with(SchedulerConfig {
        restart_after_minutes: 1,
        ..Default::default()
    });
    h.add(Task::new("a", "cmd").every(60).scheduled_at(t0()));
    h.ongoing("left-over", "a", t0() - Duration::minutes(5));

    let began = tokio::time::Instant::now();
    h.scheduler
        .run(None, std::future::pending())
        .await
        .unwrap();

    assert_eq!(began.elapsed(), std::time::Duration::from_secs(60));
    assert_eq!(h.commands(), vec!["cmd"]);
    let left_over = h.store.get_execution(&"left-over".into()).unwrap().unwrap();
    assert_eq!(left_over.status, ExecutionStatus::Killed);
}

#[tokio::test(start_paused = true)]
async fn cycles_are_paced_by_sleep_duration() {
    let h = harness_with(SchedulerConfig {
        restart_after_minutes: 1,
        sleep_duration_s: 5,
        ..Default::default()
    });
    // Always due again: the task asks for a run in the past
    h.add(Task::new("a", "eager").scheduled_at(t0()));
    h.runner.on(
        "eager",
        FakeResponse::output("_qs_next_run: 2000-01-01T00:00:00Z\n"),
    );

    h.scheduler
        .run(None, std::future::pending())
        .await
        .unwrap();

    assert_eq!(h.runner.calls().len(), 12);
}

#[tokio::test(start_paused = true)]
async fn sleep_never_drops_below_minimum() {
    let h = harness_with(SchedulerConfig {
        restart_after_minutes: 1,
        sleep_duration_s: 0,
        min_cycle_sleep_s: 2,
        ..Default::default()
    });
    h.add(Task::new("a", "eager").scheduled_at(t0()));
    h.runner.on(
        "eager",
        FakeResponse::output("_qs_next_run: 2000-01-01T00:00:00Z\n"),
    );

    h.scheduler
        .run(None, std::future::pending())
        .await
        .unwrap();

    assert_eq!(h.runner.calls().len(), 30);
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_stops_the_loop() {
    let h = harness();
    h.add(Task::new("a", "cmd").every(5).scheduled_at(t0()));

    let began = tokio::time::Instant::now();
    h.scheduler
        .run(None, tokio::time::sleep(std::time::Duration::from_secs(12)))
        .await
        .unwrap();

    assert!(began.elapsed() < std::time::Duration::from_secs(13));
    assert!(!h.runner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_locked_skips_when_another_instance_holds_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(SchedulerConfig {
        restart_after_minutes: 0,
        ..Default::default()
    });
    h.add(Task::new("a", "cmd").scheduled_at(t0()));
    let lock = InstanceLock::new(dir.path(), Some("host"), h.store.clone(), h.clock.clone())
        .with_boot_time(None);

    let held = lock
        .acquire(&h.scheduler.lock_name(), None, None)
        .await
        .unwrap();
    let ran = h
        .scheduler
        .run_locked(&lock, std::future::pending())
        .await
        .unwrap();
    assert!(!ran);

    drop(held);
    let ran = h
        .scheduler
        .run_locked(&lock, std::future::pending())
        .await
        .unwrap();
    assert!(ran);
    assert!(!lock.lock_path(&h.scheduler.lock_name()).exists());
}

#[tokio::test]
async fn run_once_sweeps_and_cycles() {
    let h = harness();
    h.add(Task::new("a", "cmd").scheduled_at(t0()));
    h.ongoing("crashed", "a", t0() - Duration::minutes(1));

    let summary = h.scheduler.run_once().await.unwrap();

    assert_eq!(summary.dispatched, 1);
    let crashed = h.store.get_execution(&"crashed".into()).unwrap().unwrap();
    assert_eq!(crashed.status, ExecutionStatus::Killed);
}
