// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch directory holding a config file, a lock directory and a store
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let locks = dir.path().join("locks");
        fs::create_dir_all(&locks).expect("Failed to create lock dir");
        fs::write(
            dir.path().join("qs.toml"),
            format!(
                "lock_dir = \"{}\"\nlock_prefix = \"test-host\"\nsleep_duration_s = 1\n",
                locks.display()
            ),
        )
        .expect("Failed to write config");
        Self { dir }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("quicksilver.wal")
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.dir.path().join("locks")
    }

    /// `qs` pointed at this environment's config and store
    pub fn qs(&self) -> Command {
        let mut cmd = Command::cargo_bin("qs").expect("qs binary");
        cmd.current_dir(self.dir.path())
            .env("QS_CONFIG", self.dir.path().join("qs.toml"))
            .env("QS_STORE", self.store_path())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run `qs <args> -o json` and parse stdout
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .qs()
            .args(args)
            .args(["-o", "json"])
            .output()
            .expect("run qs");
        assert!(
            output.status.success(),
            "qs {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("valid json")
    }
}
