// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-based advisory lock: `O_CREAT|O_EXCL` create, mtime-staleness
//! reclaim, and unlink-on-release. Used for both the job queue lock and the
//! singleton queue-runner lock, which share the same protocol.

use crate::io::StoreIo;
use oj_core::{OjError, OjResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub struct FileLock {
    io: Arc<dyn StoreIo>,
    path: PathBuf,
    stale_timeout: Duration,
    retry_sleep: Duration,
    max_attempts: u32,
}

impl FileLock {
    pub fn new(io: Arc<dyn StoreIo>, path: impl Into<PathBuf>) -> Self {
        Self {
            io,
            path: path.into(),
            stale_timeout: Duration::from_secs(30),
            retry_sleep: Duration::from_millis(100),
            max_attempts: 50,
        }
    }

    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, sleep: Duration, max_attempts: u32) -> Self {
        self.retry_sleep = sleep;
        self.max_attempts = max_attempts;
        self
    }

    /// Acquire the lock, reclaiming a stale holder's file if its mtime is
    /// older than the stale timeout. Blocks (via sleep/retry) up to
    /// `max_attempts` times otherwise.
    pub fn acquire(&self) -> OjResult<LockGuard<'_>> {
        let pid = std::process::id().to_string();
        for attempt in 0..self.max_attempts {
            match self.io.create_exclusive(&self.path, pid.as_bytes()) {
                Ok(()) => {
                    return Ok(LockGuard {
                        io: &*self.io,
                        path: &self.path,
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.is_stale()? {
                        let _ = self.io.remove_file(&self.path);
                        continue;
                    }
                    if attempt + 1 < self.max_attempts {
                        std::thread::sleep(self.retry_sleep);
                    }
                }
                Err(e) => return Err(OjError::Io(e)),
            }
        }
        Err(OjError::LockTimeout {
            path: self.path.display().to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Run `f` while holding the lock, releasing on every exit path.
    pub fn with_lock<R>(&self, f: impl FnOnce() -> OjResult<R>) -> OjResult<R> {
        let _guard = self.acquire()?;
        f()
    }

    fn is_stale(&self) -> OjResult<bool> {
        // A lock file removed between our failed create and this stat is
        // effectively released; treat it as not stale so we retry the create.
        let Ok(modified) = self.io.modified(&self.path) else {
            return Ok(false);
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age > self.stale_timeout)
    }
}

/// Held while the lock is acquired; releases (unlinks) on drop.
pub struct LockGuard<'a> {
    io: &'a dyn StoreIo,
    path: &'a Path,
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("path", &self.path).finish()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = self.io.remove_file(self.path);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
