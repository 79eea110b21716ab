// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting, stopping, and probing the `ojd` background process.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::client::ClientError;

/// Start the daemon in the background, returning the child process handle.
pub fn start_daemon_background(config_path: &Path) -> Result<std::process::Child, ClientError> {
    let ojd_path = find_ojd_binary();
    Command::new(&ojd_path)
        .arg("--config")
        .arg(config_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon (SIGTERM, then poll, then SIGKILL if it doesn't exit).
pub async fn stop_daemon(pid_path: &Path, exit_timeout: Duration) -> bool {
    let Some(pid) = read_daemon_pid(pid_path) else {
        return false;
    };

    kill_signal("-15", pid);
    if !wait_for_exit(pid, exit_timeout).await {
        kill_signal("-9", pid);
        wait_for_exit(pid, exit_timeout).await;
    }
    let _ = std::fs::remove_file(pid_path);
    true
}

/// Poll until `pid` no longer exists, or `timeout` elapses.
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    !process_exists(pid)
}

/// Locate the `ojd` binary: `OJD_BINARY` env override, a sibling of this
/// executable, or fall back to the plain name resolved via `PATH`.
fn find_ojd_binary() -> PathBuf {
    if let Ok(path) = std::env::var("OJD_BINARY") {
        return PathBuf::from(path);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("ojd");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("ojd")
}

/// Read the daemon's PID from its PID file, if present and parseable.
pub fn read_daemon_pid(pid_path: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_path).ok()?.trim().parse().ok()
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check whether a process with the given PID still exists.
pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

/// Probe whether a Unix socket is currently accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove a socket/PID pair left behind by a daemon that crashed without
/// cleaning up after itself.
pub fn cleanup_stale_files(socket_path: &Path, pid_path: &Path) {
    let stale = match read_daemon_pid(pid_path) {
        Some(pid) => !process_exists(pid),
        None => true,
    };
    if stale {
        let _ = std::fs::remove_file(socket_path);
        let _ = std::fs::remove_file(pid_path);
    }
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
