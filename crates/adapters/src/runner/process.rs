// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess runner

use super::{CommandRunner, Invocation, OutputBuffer, RunnerError};
use async_trait::async_trait;
use qs_core::directive::{CONTEXT_ENV, NEXT_INTERVAL_ENV};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Runs task commands as child processes.
///
/// Stdout is streamed line by line into the output buffer. Stderr is
/// collected into a second buffer with the same limit and appended only
/// when the program fails. Bytes that are not UTF-8 are replaced rather
/// than failing the run. The child is killed if the run is abandoned (for
/// example on timeout).
#[derive(Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation, output: &OutputBuffer) -> Result<(), RunnerError> {
        let mut child = Command::new(&invocation.command)
            .args(&invocation.arguments)
            .env(CONTEXT_ENV, "1")
            .env(NEXT_INTERVAL_ENV, invocation.next_interval_secs.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: invocation.command.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let errors = output.empty_like();
        let (stdout_result, stderr_result) =
            tokio::join!(capture(stdout, output), capture(stderr, &errors));
        stdout_result?;
        stderr_result?;
        let status = child.wait().await?;

        if status.success() {
            return Ok(());
        }

        if !errors.is_empty() {
            output.push_str(&errors.contents());
        }
        Err(RunnerError::Failed {
            command: invocation.command.clone(),
            code: status.code(),
        })
    }
}

/// Copy `stream` into `buffer` a line at a time
async fn capture<S: AsyncRead + Unpin>(
    stream: Option<S>,
    buffer: &OutputBuffer,
) -> std::io::Result<()> {
    let Some(stream) = stream else {
        return Ok(());
    };
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        buffer.push_line(&String::from_utf8_lossy(&line));
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
