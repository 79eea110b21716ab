// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix domain socket listener for the CLI's control-plane requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use oj_core::{Clock, InstanceId, OjError, TaskId, WorkflowInstance};
use oj_storage::{QueueStore, TaskStore};
use oj_workflow_def::Format;
use serde_json::json;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::protocol::{read_request, write_response, Request, Response, DEFAULT_TIMEOUT};
use crate::supervisor::Supervisor;

/// Shared state handed to every connection handler.
pub struct ControlServer {
    socket_path: PathBuf,
    data_root: PathBuf,
    task_store: Arc<TaskStore>,
    queue: Arc<QueueStore>,
    supervisor: Arc<Supervisor>,
    clock: Arc<dyn Clock>,
}

impl ControlServer {
    pub fn new(
        socket_path: PathBuf,
        data_root: PathBuf,
        task_store: Arc<TaskStore>,
        queue: Arc<QueueStore>,
        supervisor: Arc<Supervisor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            socket_path,
            data_root,
            task_store,
            queue,
            supervisor,
            clock,
        }
    }

    /// Binds the socket (replacing a stale one left by a prior crash) and
    /// serves connections until `cancel` fires.
    pub async fn serve(self: Arc<Self>, cancel: CancellationToken) -> std::io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, _addr) = accepted?;
                    let server = Arc::clone(&self);
                    tokio::spawn(async move { server.handle_connection(stream).await });
                }
            }
        }
    }

    async fn handle_connection(&self, mut stream: UnixStream) {
        loop {
            let request = match read_request(&mut stream, DEFAULT_TIMEOUT).await {
                Ok(req) => req,
                Err(_) => return,
            };
            let response = self.dispatch(request).await;
            if write_response(&mut stream, &response, DEFAULT_TIMEOUT).await.is_err() {
                return;
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Response {
        let result = match request {
            Request::TaskList => self.task_list(),
            Request::TaskGet { task_id } => self.task_get(&task_id),
            Request::TaskLogs { task_id, lines } => self.task_logs(&task_id, lines),
            Request::TaskStop { task_id } => self.task_stop(&task_id),
            Request::TaskResume { task_id } => self.task_resume(&task_id),
            Request::TaskPause { task_id } => self.task_pause(&task_id),
            Request::WorkflowCreate { task_id, document, format } => self.workflow_create(&task_id, &document, &format),
            Request::WorkflowStatus { task_id } => self.workflow_status(&task_id),
            Request::SelfCheck => self.self_check(),
        };
        match result {
            Ok(data) => Response::ok(data),
            Err(err) => Response::error(err.to_string()),
        }
    }

    fn task_list(&self) -> Result<serde_json::Value, OjError> {
        let tasks = self.task_store.get_all_tasks()?;
        Ok(json!(tasks))
    }

    fn task_get(&self, task_id: &str) -> Result<serde_json::Value, OjError> {
        let id = self.task_store.resolve_id(task_id)?;
        let task = self.task_store.get_task(&id)?.ok_or_else(|| OjError::NotFound(task_id.to_string()))?;
        Ok(json!(task))
    }

    fn task_logs(&self, task_id: &str, lines: usize) -> Result<serde_json::Value, OjError> {
        let id = self.task_store.resolve_id(task_id)?;
        let log_path = self
            .supervisor_logs_dir(&id)
            .join("execution.log");
        let content = std::fs::read_to_string(&log_path).unwrap_or_default();
        let tail: Vec<&str> = content.lines().rev().take(lines.max(1)).collect();
        Ok(json!(tail.into_iter().rev().collect::<Vec<_>>()))
    }

    fn supervisor_logs_dir(&self, id: &TaskId) -> PathBuf {
        self.data_root.join("tasks").join(id.as_str()).join("logs")
    }

    fn task_stop(&self, task_id: &str) -> Result<serde_json::Value, OjError> {
        let id = self.task_store.resolve_id(task_id)?;
        self.supervisor.mark_stopped(&id).map_err(to_core_error)?;
        Ok(json!({ "task_id": id.as_str() }))
    }

    fn task_resume(&self, task_id: &str) -> Result<serde_json::Value, OjError> {
        let id = self.task_store.resolve_id(task_id)?;
        let info = self.supervisor.resume_task(&id).map_err(to_core_error)?;
        Ok(json!({ "task_id": id.as_str(), "pid": info.pid }))
    }

    fn task_pause(&self, task_id: &str) -> Result<serde_json::Value, OjError> {
        let id = self.task_store.resolve_id(task_id)?;
        self.task_store.update_task(&id, |task| task.status = oj_core::TaskStatus::Paused)?;
        Ok(json!({ "task_id": id.as_str() }))
    }

    fn workflow_create(&self, task_id: &str, document: &str, format: &str) -> Result<serde_json::Value, OjError> {
        let fmt = Format::from_extension(format).ok_or_else(|| OjError::InvalidState(format!("unknown format {format}")))?;
        let workflow = oj_workflow_def::parse_workflow(document, fmt, task_id, task_id)
            .map_err(|e| OjError::InvalidState(e.to_string()))?;
        let id = TaskId::new(task_id.to_string());
        self.task_store.save_workflow(&id, &workflow)?;

        let instance = WorkflowInstance::new(&*self.clock, InstanceId::new(task_id.to_string()), workflow.id.to_string());
        self.task_store.save_instance(&id, &instance)?;

        let start_node = workflow
            .start_node()
            .ok_or_else(|| OjError::InvalidState("workflow has no start node".into()))?;
        self.queue.enqueue(
            &*self.clock,
            oj_core::JobData {
                workflow_id: task_id.to_string(),
                instance_id: instance.id.to_string(),
                node_id: start_node.id.to_string(),
                attempt: 1,
            },
        )?;
        Ok(json!({ "workflow_id": workflow.id.as_str(), "instance_id": instance.id.as_str() }))
    }

    fn workflow_status(&self, task_id: &str) -> Result<serde_json::Value, OjError> {
        let id = self.task_store.resolve_id(task_id)?;
        let instance = self.task_store.get_instance(&id)?.ok_or_else(|| OjError::NotFound(task_id.to_string()))?;
        Ok(json!(instance))
    }

    fn self_check(&self) -> Result<serde_json::Value, OjError> {
        let orphaned = self.supervisor.detect_orphaned_tasks().map_err(to_core_error)?;
        Ok(json!({ "orphaned_tasks": orphaned.iter().map(|t| t.to_string()).collect::<Vec<_>>() }))
    }
}

fn to_core_error(err: crate::error::DaemonError) -> OjError {
    match err {
        crate::error::DaemonError::Core(e) => e,
        other => OjError::InvalidState(other.to_string()),
    }
}

pub fn socket_path_from_data_root(data_root: &Path) -> PathBuf {
    data_root.join("daemon.sock")
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
