// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifier that hands alerts to an external program

use super::{NotifyAdapter, NotifyContext, NotifyError, TemplateKind};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs `program [args..] <template_kind>` with the context as JSON on stdin
#[derive(Clone, Debug)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args..]` list; `None` when it is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl NotifyAdapter for CommandNotifier {
    async fn notify(&self, kind: TemplateKind, context: &NotifyContext) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(context)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(kind.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NotifyError::CommandFailed(format!(
                "{} {}: {}",
                self.program,
                kind,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
