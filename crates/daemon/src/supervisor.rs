// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor: detached subprocess spawn, pid tracking, orphan
//! detection, and the singleton queue-runner lock.
//!
//! Each task runs in its own `ojd task-run` subprocess so a crash in one
//! task's workflow never takes the daemon down with it. The supervisor only
//! tracks liveness; the subprocess itself owns the instance file and drives
//! it through `oj-engine`.

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use oj_core::{Clock, OjError, ProcessInfo, ProcessStatus, Task, TaskId};
use oj_storage::{FileLock, StoreIo, TaskStore};

use crate::error::{DaemonError, DaemonResult};

/// Spawns and supervises per-task subprocesses under `data_root`.
pub struct Supervisor {
    data_root: PathBuf,
    task_store: Arc<TaskStore>,
    io: Arc<dyn StoreIo>,
    clock: Arc<dyn Clock>,
    exe: PathBuf,
}

impl Supervisor {
    pub fn new(data_root: PathBuf, task_store: Arc<TaskStore>, io: Arc<dyn StoreIo>, clock: Arc<dyn Clock>) -> Self {
        let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("ojd"));
        Self {
            data_root,
            task_store,
            io,
            clock,
            exe,
        }
    }

    /// Overrides the binary spawned for task subprocesses; exercised by
    /// tests so they don't have to re-exec the test harness itself.
    #[cfg(test)]
    pub(crate) fn with_exe(mut self, exe: PathBuf) -> Self {
        self.exe = exe;
        self
    }

    fn logs_dir(&self, id: &TaskId) -> PathBuf {
        self.data_root.join("tasks").join(id.as_str()).join("logs")
    }

    /// Spawns `ojd task-run --task-id <id> [--resume]` detached from the
    /// daemon's session, redirects its output to `tasks/<id>/logs/execution.log`,
    /// and records the child pid before the `Child` handle is dropped.
    pub fn spawn_task(&self, task_id: &TaskId, resume: bool) -> DaemonResult<ProcessInfo> {
        let logs_dir = self.logs_dir(task_id);
        std::fs::create_dir_all(&logs_dir)?;
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join("execution.log"))?;
        let log_file_err = log_file.try_clone()?;

        let mut cmd = Command::new(&self.exe);
        cmd.arg("task-run").arg("--task-id").arg(task_id.as_str());
        if resume {
            cmd.arg("--resume");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_err));
        // New process group (leader = the child itself) so the daemon can
        // exit or crash without taking task subprocesses down with it.
        cmd.process_group(0);

        let child = cmd.spawn()?;
        let pid = child.id();

        #[cfg(target_os = "macos")]
        {
            let _ = Command::new("caffeinate").arg("-w").arg(pid.to_string()).spawn();
        }

        let info = ProcessInfo::new(pid, self.clock.now());
        self.task_store.save_process(task_id, &info)?;
        // The child keeps running detached; we only need its pid, recorded
        // above, so the handle is intentionally dropped here.
        drop(child);
        Ok(info)
    }

    /// Lists tasks whose recorded process is `Running` but whose pid no
    /// longer answers a signal-0 liveness probe.
    pub fn detect_orphaned_tasks(&self) -> DaemonResult<Vec<TaskId>> {
        let mut orphaned = Vec::new();
        for task in self.task_store.get_all_tasks()? {
            let Some(process) = self.task_store.get_process(&task.id)? else {
                continue;
            };
            if process.status == ProcessStatus::Running && !is_alive(process.pid) {
                orphaned.push(task.id);
            }
        }
        Ok(orphaned)
    }

    /// Idempotent resume: re-checks liveness first so a call racing an
    /// already-resumed process is a no-op rather than a duplicate spawn.
    pub fn resume_task(&self, task_id: &TaskId) -> DaemonResult<ProcessInfo> {
        if let Some(process) = self.task_store.get_process(task_id)? {
            if process.status == ProcessStatus::Running && is_alive(process.pid) {
                return Ok(process);
            }
        }
        self.spawn_task(task_id, true)
    }

    pub fn mark_stopped(&self, task_id: &TaskId) -> DaemonResult<()> {
        if let Some(mut process) = self.task_store.get_process(task_id)? {
            process.status = ProcessStatus::Stopped;
            self.task_store.save_process(task_id, &process)?;
        }
        Ok(())
    }

    pub fn get_task(&self, task_id: &TaskId) -> DaemonResult<Task> {
        self.task_store
            .get_task(task_id)?
            .ok_or_else(|| DaemonError::Core(OjError::NotFound(task_id.as_str().to_string())))
    }

    /// The lock protecting the singleton queue-runner role, sharing the
    /// queue lock's stale-reclaim protocol but parameterized on its own path.
    pub fn runner_lock(&self) -> FileLock {
        FileLock::new(Arc::clone(&self.io), self.data_root.join("runner.lock"))
    }
}

fn is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
