// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process pub/sub event bus (§4.8).
//!
//! Dispatch is synchronous and each listener runs inside an isolation
//! wrapper: a panicking or error-returning listener is logged and does not
//! prevent subsequent listeners from running (§8 invariant 6).

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskCompleted {
        task_id: String,
    },
    WorkflowStarted {
        task_id: String,
        instance_id: String,
    },
    WorkflowCompleted {
        task_id: String,
        instance_id: String,
    },
    WorkflowFailed {
        task_id: String,
        instance_id: String,
        error: String,
    },
    NodeStarted {
        instance_id: String,
        node_id: String,
    },
    NodeCompleted {
        instance_id: String,
        node_id: String,
    },
    NodeFailed {
        instance_id: String,
        node_id: String,
        error: String,
    },
}

impl Event {
    /// Name used for the `tracing` span/event and for CLI display.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskCompleted { .. } => "task:completed",
            Self::WorkflowStarted { .. } => "workflow:started",
            Self::WorkflowCompleted { .. } => "workflow:completed",
            Self::WorkflowFailed { .. } => "workflow:failed",
            Self::NodeStarted { .. } => "node:started",
            Self::NodeCompleted { .. } => "node:completed",
            Self::NodeFailed { .. } => "node:failed",
        }
    }

    /// Structured fields for logging, mirroring the event's payload.
    pub fn log_summary(&self) -> String {
        match self {
            Self::TaskCompleted { task_id } => format!("task_id={task_id}"),
            Self::WorkflowStarted {
                task_id,
                instance_id,
            }
            | Self::WorkflowCompleted {
                task_id,
                instance_id,
            } => format!("task_id={task_id} instance_id={instance_id}"),
            Self::WorkflowFailed {
                task_id,
                instance_id,
                error,
            } => format!("task_id={task_id} instance_id={instance_id} error={error}"),
            Self::NodeStarted {
                instance_id,
                node_id,
            }
            | Self::NodeCompleted {
                instance_id,
                node_id,
            } => format!("instance_id={instance_id} node_id={node_id}"),
            Self::NodeFailed {
                instance_id,
                node_id,
                error,
            } => format!("instance_id={instance_id} node_id={node_id} error={error}"),
        }
    }
}

type SyncListener = dyn Fn(&Event) + Send + Sync;
type AsyncListener = dyn Fn(&Event) -> BoxFuture<'static, ()> + Send + Sync;

/// In-process pub/sub bus. Cheap to clone; all clones share listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    sync_listeners: Arc<RwLock<Vec<Arc<SyncListener>>>>,
    async_listeners: Arc<RwLock<Vec<Arc<AsyncListener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.sync_listeners.write().push(Arc::new(listener));
    }

    pub fn subscribe_async<F>(&self, listener: F)
    where
        F: Fn(&Event) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.async_listeners.write().push(Arc::new(listener));
    }

    /// Dispatch synchronously; async listeners are spawned and not awaited.
    pub fn emit(&self, event: &Event) {
        for listener in self.sync_listeners.read().iter() {
            let listener = listener.clone();
            let event_clone = event.clone();
            let result = catch_unwind(AssertUnwindSafe(|| listener(&event_clone)));
            if result.is_err() {
                tracing::error!(event = event.name(), "event listener panicked");
            }
        }
        for listener in self.async_listeners.read().iter() {
            let fut = listener(event);
            tokio::spawn(async move {
                fut.await;
            });
        }
    }

    /// Dispatch and await every async listener. Use when the caller is about
    /// to exit and cannot rely on a detached `tokio::spawn` draining first.
    pub async fn emit_async(&self, event: &Event) {
        for listener in self.sync_listeners.read().iter() {
            let listener = listener.clone();
            let event_clone = event.clone();
            let result = catch_unwind(AssertUnwindSafe(|| listener(&event_clone)));
            if result.is_err() {
                tracing::error!(event = event.name(), "event listener panicked");
            }
        }
        let futures: Vec<_> = self
            .async_listeners
            .read()
            .iter()
            .map(|listener| listener(event))
            .collect();
        for fut in futures {
            fut.await;
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
