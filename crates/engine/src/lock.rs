// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-host instance lock with stale-lock recovery
//!
//! A lock is a file in the lock directory, created exclusively and held
//! with an advisory `flock` for as long as the [`LockHandle`] lives. Next
//! to the locks sits a startup marker recording when the current boot (or
//! container lifetime) began. A lock file older than the marker was left
//! behind by a previous boot: it is removed, the `ongoing` executions it
//! was guarding are deleted, and acquisition is retried once.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use qs_core::{Clock, ExecutionFilter, ExecutionStatus, RepoError, TaskRepository};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const MARKER_NAME: &str = "__startup__";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {0} is held by another instance")]
    AlreadyLocked(String),
    #[error("timed out after {waited:?} waiting for lock {name}")]
    Timeout { name: String, waited: Duration },
    #[error("lock io error: {0}")]
    Io(#[from] io::Error),
    #[error("stale lock cleanup failed: {0}")]
    Repo(#[from] RepoError),
}

impl LockError {
    /// Contention outcomes end a run quietly rather than failing it
    pub fn is_contention(&self) -> bool {
        matches!(self, LockError::AlreadyLocked(_) | LockError::Timeout { .. })
    }
}

/// An acquired instance lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockHandle {
    name: String,
    path: PathBuf,
    file: File,
}

impl LockHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Refresh the lock file's modification time so operators can see the
    /// holder is alive
    pub fn touch(&self) -> io::Result<()> {
        self.file.set_modified(std::time::SystemTime::now())
    }

    /// Release explicitly; same as dropping
    pub fn release(self) {}
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.name, error = %e, "failed to remove lock file");
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.name, error = %e, "failed to unlock");
        }
        tracing::info!(lock = %self.name, "lock released");
    }
}

/// Lock factory for one host (or site) and lock directory
#[derive(Clone)]
pub struct InstanceLock<R, C> {
    dir: PathBuf,
    prefix: String,
    boot_time: Option<DateTime<Utc>>,
    repo: R,
    clock: C,
}

impl<R: TaskRepository, C: Clock> InstanceLock<R, C> {
    /// `prefix` names the host or site; `None` uses the hostname
    pub fn new(dir: impl Into<PathBuf>, prefix: Option<&str>, repo: R, clock: C) -> Self {
        let prefix = match prefix {
            Some(prefix) => slugify(prefix),
            None => slugify(&host_identifier()),
        };
        Self {
            dir: dir.into(),
            prefix,
            boot_time: system_boot_time(),
            repo,
            clock,
        }
    }

    /// Override the detected boot time
    pub fn with_boot_time(mut self, boot_time: Option<DateTime<Utc>>) -> Self {
        self.boot_time = boot_time;
        self
    }

    /// Full lock name for `name` on this host
    pub fn lock_name(&self, name: &str) -> String {
        format!("{}__{}", self.prefix, slugify(name))
    }

    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", self.lock_name(name)))
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(format!("{}{}.lock", self.prefix, MARKER_NAME))
    }

    /// Time the current boot epoch began, creating the marker on first use.
    ///
    /// A marker written before the system booted belongs to an earlier
    /// lifetime and is replaced.
    pub fn startup_marker(&self) -> io::Result<DateTime<Utc>> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.marker_path();

        if path.exists() {
            let recorded = read_stamp(&path)?;
            match self.boot_time {
                Some(boot) if recorded < boot => {
                    tracing::info!(%recorded, %boot, "startup marker predates boot, recreating");
                    std::fs::remove_file(&path)?;
                }
                _ => return Ok(recorded),
            }
        }

        let now = self.clock.now();
        match create_stamped(&path, now) {
            Ok(_) => Ok(now),
            // Another instance created it first
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => read_stamp(&path),
            Err(e) => Err(e),
        }
    }

    /// Acquire `name`, optionally waiting for a live holder to let go.
    ///
    /// `queue` scopes the stale-execution cleanup; without it a stale lock
    /// file is only removed.
    pub async fn acquire(
        &self,
        name: &str,
        queue: Option<&str>,
        wait: Option<Duration>,
    ) -> Result<LockHandle, LockError> {
        let full_name = self.lock_name(name);
        match self.try_acquire(name, queue) {
            Err(LockError::AlreadyLocked(_)) => {}
            other => return other,
        }

        let Some(wait) = wait else {
            return Err(LockError::AlreadyLocked(full_name));
        };

        let started = tokio::time::Instant::now();
        loop {
            if started.elapsed() >= wait {
                return Err(LockError::Timeout {
                    name: full_name,
                    waited: wait,
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(wait)).await;
            match self.try_acquire(name, queue) {
                Err(LockError::AlreadyLocked(_)) => continue,
                other => return other,
            }
        }
    }

    fn try_acquire(&self, name: &str, queue: Option<&str>) -> Result<LockHandle, LockError> {
        // The marker must exist before any lock of this epoch is created
        let marker = self.startup_marker()?;
        let full_name = self.lock_name(name);
        let path = self.lock_path(name);

        if let Some(handle) = self.try_create(&full_name, &path)? {
            return Ok(handle);
        }

        let created = read_stamp(&path)?;
        if created < marker {
            tracing::warn!(lock = %full_name, %created, %marker, "removing stale lock");
            remove_if_exists(&path)?;
            self.clear_stale_executions(queue, marker)?;
            return self
                .try_create(&full_name, &path)?
                .ok_or(LockError::AlreadyLocked(full_name));
        }

        // Same epoch: live only if someone still holds the flock
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            // Released between our checks
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return self
                    .try_create(&full_name, &path)?
                    .ok_or(LockError::AlreadyLocked(full_name));
            }
            Err(e) => return Err(e.into()),
        };
        self.take_over(full_name, path, file)
    }

    /// Claim a lock file left behind by a dead process in this boot.
    ///
    /// The holder unlinks the file before unlocking it, so a successful
    /// `flock` on an inode that is no longer at `path` means the lock was
    /// released in between and this handle guards nothing.
    fn take_over(
        &self,
        full_name: String,
        path: PathBuf,
        file: File,
    ) -> Result<LockHandle, LockError> {
        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked(full_name));
        }
        if !is_linked_at(&file, &path)? {
            FileExt::unlock(&file)?;
            tracing::debug!(lock = %full_name, "lock file released during takeover");
            return Err(LockError::AlreadyLocked(full_name));
        }

        tracing::warn!(lock = %full_name, "taking over lock abandoned by a dead process");
        file.set_len(0)?;
        write_stamp(&file, self.clock.now())?;
        tracing::info!(lock = %full_name, "lock acquired");
        Ok(LockHandle {
            name: full_name,
            path,
            file,
        })
    }

    fn try_create(&self, full_name: &str, path: &Path) -> Result<Option<LockHandle>, LockError> {
        let file = match create_stamped(path, self.clock.now()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // Lost a takeover race to a peer that saw the file first
        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked(full_name.to_string()));
        }
        tracing::info!(lock = %full_name, "lock acquired");
        Ok(Some(LockHandle {
            name: full_name.to_string(),
            path: path.to_path_buf(),
            file,
        }))
    }

    fn clear_stale_executions(
        &self,
        queue: Option<&str>,
        marker: DateTime<Utc>,
    ) -> Result<(), LockError> {
        let Some(queue) = queue else {
            return Ok(());
        };
        let removed = self.repo.delete_executions(&ExecutionFilter {
            queue: Some(queue.to_string()),
            status: Some(ExecutionStatus::Ongoing),
            started_before: Some(marker),
            ended_before: None,
        })?;
        tracing::warn!(queue, removed, "deleted ongoing executions from a previous boot");
        Ok(())
    }
}

/// Run `f` while holding the lock `name`.
///
/// Returns `Ok(None)` without calling `f` when another instance holds the
/// lock or the wait times out. The lock is released when `f`'s future
/// completes or is dropped.
pub async fn with_instance_lock<R, C, F, Fut, T>(
    lock: &InstanceLock<R, C>,
    name: &str,
    queue: Option<&str>,
    wait: Option<Duration>,
    f: F,
) -> Result<Option<T>, LockError>
where
    R: TaskRepository,
    C: Clock,
    F: FnOnce(LockHandle) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    match lock.acquire(name, queue, wait).await {
        Ok(handle) => Ok(Some(f(handle).await)),
        Err(e) if e.is_contention() => {
            tracing::info!(lock = name, reason = %e, "lock unavailable, exiting");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Lowercase ASCII slug: runs of anything but letters and digits become `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// This machine's hostname, or `localhost` when it cannot be read
pub fn host_identifier() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Boot time from `/proc/stat`, where available
pub fn system_boot_time() -> Option<DateTime<Utc>> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    parse_btime(&stat)
}

fn parse_btime(stat: &str) -> Option<DateTime<Utc>> {
    let secs = stat
        .lines()
        .find_map(|line| line.strip_prefix("btime "))?
        .trim()
        .parse::<i64>()
        .ok()?;
    DateTime::from_timestamp(secs, 0)
}

fn create_stamped(path: &Path, at: DateTime<Utc>) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)?;
    write_stamp(&file, at)?;
    Ok(file)
}

fn write_stamp(mut file: &File, at: DateTime<Utc>) -> io::Result<()> {
    writeln!(file, "{}", at.to_rfc3339())?;
    writeln!(file, "{}", std::process::id())?;
    file.sync_all()
}

/// Creation time recorded in a lock or marker file, falling back to the
/// file's metadata
fn read_stamp(path: &Path) -> io::Result<DateTime<Utc>> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    if let Some(at) = content
        .lines()
        .next()
        .and_then(qs_core::directive::parse_timestamp)
    {
        return Ok(at);
    }
    let meta = std::fs::metadata(path)?;
    let time = meta.created().or_else(|_| meta.modified())?;
    Ok(DateTime::<Utc>::from(time))
}

/// Whether `file` is the inode currently linked at `path`
#[cfg(unix)]
fn is_linked_at(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let linked = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let open = file.metadata()?;
    Ok(open.dev() == linked.dev() && open.ino() == linked.ino())
}

#[cfg(not(unix))]
fn is_linked_at(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
