// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client for the daemon's control socket: one async method per
//! [`oj_daemon::protocol::Request`] variant, all funneled through [`send`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use oj_daemon::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};
use serde_json::Value;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::daemon_process::{cleanup_stale_files, probe_socket, start_daemon_background};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,
    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),
    #[error("timed out waiting for daemon to start")]
    DaemonStartTimeout,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon returned an error: {0}")]
    Rejected(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to an already-running daemon; error if there isn't one.
    pub fn connect(socket_path: PathBuf) -> Result<Self, ClientError> {
        if !socket_path.exists() || !probe_socket(&socket_path) {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    /// Connect to the daemon, spawning it in the background if it isn't
    /// already running. Used by action commands (`task resume`, `workflow
    /// create`, ...); query commands should prefer [`Self::connect`] so a
    /// `status` check doesn't have the side effect of starting a daemon.
    pub async fn connect_or_start(socket_path: PathBuf, pid_path: &std::path::Path, config_path: &std::path::Path) -> Result<Self, ClientError> {
        if socket_path.exists() && probe_socket(&socket_path) {
            return Ok(Self { socket_path });
        }
        cleanup_stale_files(&socket_path, pid_path);
        let mut child = start_daemon_background(config_path)?;

        let start = Instant::now();
        while start.elapsed() < CONNECT_TIMEOUT {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ClientError::DaemonStartFailed(format!("exited with {status}")));
            }
            if probe_socket(&socket_path) {
                return Ok(Self { socket_path });
            }
            tokio::time::sleep(CONNECT_POLL).await;
        }
        Err(ClientError::DaemonStartTimeout)
    }

    async fn send(&self, request: Request) -> Result<Value, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = serde_json::to_vec(&request).map_err(ProtocolError::Json)?;
        tokio::time::timeout(DEFAULT_TIMEOUT, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        let response: Response = serde_json::from_slice(&response_bytes).map_err(ProtocolError::Json)?;
        match response {
            Response::Ok { data } => Ok(data),
            Response::Error { message } => Err(ClientError::Rejected(message)),
        }
    }

    pub async fn task_list(&self) -> Result<Value, ClientError> {
        self.send(Request::TaskList).await
    }

    pub async fn task_get(&self, task_id: &str) -> Result<Value, ClientError> {
        self.send(Request::TaskGet { task_id: task_id.to_string() }).await
    }

    pub async fn task_logs(&self, task_id: &str, lines: usize) -> Result<Value, ClientError> {
        self.send(Request::TaskLogs { task_id: task_id.to_string(), lines }).await
    }

    pub async fn task_stop(&self, task_id: &str) -> Result<Value, ClientError> {
        self.send(Request::TaskStop { task_id: task_id.to_string() }).await
    }

    pub async fn task_resume(&self, task_id: &str) -> Result<Value, ClientError> {
        self.send(Request::TaskResume { task_id: task_id.to_string() }).await
    }

    pub async fn task_pause(&self, task_id: &str) -> Result<Value, ClientError> {
        self.send(Request::TaskPause { task_id: task_id.to_string() }).await
    }

    pub async fn workflow_create(&self, task_id: &str, document: String, format: &str) -> Result<Value, ClientError> {
        self.send(Request::WorkflowCreate { task_id: task_id.to_string(), document, format: format.to_string() }).await
    }

    pub async fn workflow_status(&self, task_id: &str) -> Result<Value, ClientError> {
        self.send(Request::WorkflowStatus { task_id: task_id.to_string() }).await
    }

    pub async fn self_check(&self) -> Result<Value, ClientError> {
        self.send(Request::SelfCheck).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
