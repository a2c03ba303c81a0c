// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! The log is shared by every scheduler process on the host. Writers hold
//! an exclusive advisory lock on the file, read whatever other processes
//! appended since their last visit, then append their own entries.
//!
//! Compaction writes the live state to a fresh file and renames it over
//! the log. Other handles notice the swap the next time they lock and
//! start again from the top of the new file.

use fs2::FileExt;
use qs_core::Operation;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Logs smaller than this are never compacted on size alone
const COMPACT_MIN_BYTES: u64 = 16 * 1024 * 1024;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    path: PathBuf,
    file: File,
    /// Byte offset up to which entries have been read
    offset: u64,
    /// Size of the log right after the last compaction
    base_len: u64,
    sequence: u64,
    /// Set when the file was swapped out underneath this handle
    replaced: bool,
}

/// Exclusive hold on the log file, released on drop
pub struct WalLock {
    file: File,
}

impl Drop for WalLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "failed to unlock WAL");
        }
    }
}

impl Wal {
    /// Open or create a WAL at the given path. Nothing is read yet.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            file: open_log(path)?,
            offset: 0,
            base_len: 0,
            sequence: 0,
            replaced: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the cross-process lock; blocks while another writer holds it.
    ///
    /// If another handle compacted the log since this one opened it, the
    /// new file is opened and read from the start. Check
    /// [`Wal::take_replaced`] before trusting state built from the old one.
    pub fn lock(&mut self) -> Result<WalLock, WalError> {
        loop {
            let file = self.file.try_clone()?;
            file.lock_exclusive()?;
            if is_current(&file, &self.path)? {
                return Ok(WalLock { file });
            }
            FileExt::unlock(&file)?;
            drop(file);

            tracing::debug!(path = %self.path.display(), "WAL replaced, reopening");
            self.file = open_log(&self.path)?;
            self.offset = 0;
            self.sequence = 0;
            self.base_len = self.file.metadata()?.len();
            self.replaced = true;
        }
    }

    /// Whether the log was swapped for a compacted one since the last call
    pub fn take_replaced(&mut self) -> bool {
        std::mem::take(&mut self.replaced)
    }

    /// Read complete entries appended since the last call.
    ///
    /// Call with the lock held. A trailing line without a newline can then
    /// only come from a writer that died mid-append, so it is cut off.
    /// Complete lines that do not parse are skipped.
    pub fn read_new(&mut self) -> Result<Vec<Operation>, WalError> {
        let mut reader = self.file.try_clone()?;
        reader.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let complete = buf
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |idx| idx + 1);
        if complete < buf.len() {
            let keep = self.offset + complete as u64;
            tracing::warn!(
                path = %self.path.display(),
                dropped = buf.len() - complete,
                "truncating torn WAL entry"
            );
            self.file.set_len(keep)?;
            self.file.sync_all()?;
        }

        let mut ops = Vec::new();
        for line in buf[..complete].split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<WalEntry>(line) {
                Ok(entry) => {
                    self.sequence = entry.seq;
                    ops.push(entry.op);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt WAL entry");
                }
            }
        }

        self.offset += complete as u64;
        Ok(ops)
    }

    /// Append an operation to the log.
    ///
    /// Callers hold the lock and have caught up with `read_new`, so the
    /// end of the file is exactly `offset`.
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        self.sequence += 1;
        let entry = WalEntry {
            seq: self.sequence,
            op: op.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;
        self.offset += line.len() as u64;
        Ok(self.sequence)
    }

    /// Whether the log has grown enough past its last compaction
    pub fn needs_compaction(&self) -> bool {
        self.offset > COMPACT_MIN_BYTES.max(self.base_len.saturating_mul(2))
    }

    /// Replace the log with `ops`, which must rebuild the current state.
    ///
    /// `lock` moves to the new file, so the caller keeps exclusive access
    /// until it is dropped.
    pub fn compact(&mut self, lock: &mut WalLock, ops: &[Operation]) -> Result<(), WalError> {
        let mut buf = String::new();
        for (idx, op) in ops.iter().enumerate() {
            let entry = WalEntry {
                seq: idx as u64 + 1,
                op: op.clone(),
            };
            buf.push_str(&serde_json::to_string(&entry)?);
            buf.push('\n');
        }

        let tmp = self.compact_path();
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        let mut file = open_log(&tmp)?;
        file.lock_exclusive()?;
        file.write_all(buf.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        let before = self.offset;
        FileExt::unlock(&lock.file)?;
        lock.file = file.try_clone()?;
        self.file = file;
        self.offset = buf.len() as u64;
        self.base_len = self.offset;
        self.sequence = ops.len() as u64;

        tracing::info!(
            path = %self.path.display(),
            before,
            after = self.offset,
            entries = ops.len(),
            "compacted WAL"
        );
        Ok(())
    }

    fn compact_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".compact");
        PathBuf::from(name)
    }
}

fn open_log(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)
}

/// Whether `file` is still the one linked at `path`
#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let linked = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let open = file.metadata()?;
    Ok(open.dev() == linked.dev() && open.ino() == linked.ino())
}

#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
