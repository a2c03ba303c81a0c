// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn sh(script: &str) -> Invocation {
    Invocation::new("sh", vec!["-c".to_string(), script.to_string()], 30)
}

#[tokio::test]
async fn captures_stdout() {
    let output = OutputBuffer::new();
    ProcessRunner::new()
        .run(&sh("echo one; echo two"), &output)
        .await
        .unwrap();
    assert_eq!(output.contents(), "one\ntwo\n");
}

#[tokio::test]
async fn injects_scheduler_context() {
    let output = OutputBuffer::new();
    ProcessRunner::new()
        .run(&sh("echo \"$QS_CONTEXT $QS_NEXT_INTERVAL\""), &output)
        .await
        .unwrap();
    assert_eq!(output.contents(), "1 30\n");
}

#[tokio::test]
async fn failure_appends_stderr() {
    let output = OutputBuffer::new();
    let err = ProcessRunner::new()
        .run(&sh("echo partial; echo boom >&2; exit 3"), &output)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Failed { code: Some(3), .. }));
    assert_eq!(output.contents(), "partial\nboom\n");
}

#[tokio::test]
async fn missing_program_is_spawn_error() {
    let output = OutputBuffer::new();
    let err = ProcessRunner::new()
        .run(
            &Invocation::new("/nonexistent/qs-test-program", Vec::new(), 5),
            &output,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Spawn { .. }));
}

#[tokio::test]
async fn abandoned_run_keeps_partial_output() {
    let output = OutputBuffer::new();
    let runner = ProcessRunner::new();
    let invocation = sh("echo started; sleep 10; echo never");

    let result = tokio::time::timeout(
        Duration::from_millis(500),
        runner.run(&invocation, &output),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(output.contents(), "started\n");
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    let output = OutputBuffer::new();
    ProcessRunner::new()
        .run(&sh("printf 'caf\\351\\n'; echo done"), &output)
        .await
        .unwrap();
    assert_eq!(output.contents(), "caf\u{FFFD}\ndone\n");
}

#[tokio::test]
async fn stderr_respects_output_limit() {
    let output = OutputBuffer::with_limit(16);
    let err = ProcessRunner::new()
        .run(
            &sh("i=0; while [ $i -lt 500 ]; do echo noise-$i >&2; i=$((i+1)); done; echo tail >&2; exit 1"),
            &output,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Failed { code: Some(1), .. }));
    let text = output.contents();
    assert!(text.len() <= 16, "kept {} bytes", text.len());
    assert!(text.ends_with("tail\n"));
}
