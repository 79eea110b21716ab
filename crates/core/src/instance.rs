// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WorkflowInstance: one live execution of a workflow.

use crate::workflow::{EdgeId, NodeId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    pub struct InstanceId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Ready,
    Running,
    Done,
    Failed,
    Skipped,
    Waiting,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeState {
    #[serde(default = "default_pending")]
    pub status_holder: Option<NodeStatus>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_pending() -> Option<NodeStatus> {
    Some(NodeStatus::Pending)
}

impl NodeState {
    pub fn status(&self) -> NodeStatus {
        self.status_holder.unwrap_or(NodeStatus::Pending)
    }

    pub fn pending() -> Self {
        Self {
            status_holder: Some(NodeStatus::Pending),
            ..Default::default()
        }
    }

    pub fn transition(&mut self, clock: &dyn crate::clock::Clock, to: NodeStatus) {
        if to == NodeStatus::Running && self.started_at.is_none() {
            self.started_at = Some(clock.now());
        }
        if to.is_terminal() {
            let now = clock.now();
            self.completed_at = Some(now);
            if let Some(started) = self.started_at {
                self.duration_ms = Some((now - started).num_milliseconds());
            }
        }
        self.status_holder = Some(to);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: InstanceId,
    pub workflow_id: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub node_states: IndexMap<String, NodeState>,
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    #[serde(default)]
    pub outputs: IndexMap<String, Value>,
    #[serde(default)]
    pub loop_counts: IndexMap<String, u64>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    /// Last LLM session id observed, reused by subsequent `task` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl WorkflowInstance {
    pub fn new(clock: &dyn crate::clock::Clock, id: InstanceId, workflow_id: impl Into<String>) -> Self {
        Self {
            id,
            workflow_id: workflow_id.into(),
            status: InstanceStatus::Pending,
            node_states: IndexMap::new(),
            variables: IndexMap::new(),
            outputs: IndexMap::new(),
            loop_counts: IndexMap::new(),
            started_at: clock.now(),
            completed_at: None,
            error: None,
            paused_at: None,
            pause_reason: None,
            session_id: None,
        }
    }

    pub fn node_state(&self, id: &NodeId) -> NodeState {
        self.node_states
            .get(id.as_str())
            .cloned()
            .unwrap_or_else(NodeState::pending)
    }

    pub fn set_node_state(&mut self, id: &NodeId, state: NodeState) {
        self.node_states.insert(id.as_str().to_string(), state);
    }

    pub fn loop_count(&self, edge: &EdgeId) -> u64 {
        self.loop_counts.get(edge.as_str()).copied().unwrap_or(0)
    }

    pub fn increment_loop_count(&mut self, edge: &EdgeId) -> u64 {
        let entry = self.loop_counts.entry(edge.as_str().to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn set_output(&mut self, node: &NodeId, value: Value) {
        self.outputs.insert(node.as_str().to_string(), value);
    }

    pub fn set_variable_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        set_dotted(&mut self.variables, &segments, value);
    }
}

fn set_dotted(vars: &mut IndexMap<String, Value>, segments: &[&str], value: Value) {
    if segments.is_empty() {
        return;
    }
    if segments.len() == 1 {
        vars.insert(segments[0].to_string(), value);
        return;
    }
    let entry = vars
        .entry(segments[0].to_string())
        .or_insert_with(|| Value::Object(Default::default()));
    if !entry.is_object() {
        *entry = Value::Object(Default::default());
    }
    if let Value::Object(map) = entry {
        let mut as_index: IndexMap<String, Value> = std::mem::take(map).into_iter().collect();
        set_dotted(&mut as_index, &segments[1..], value);
        *map = as_index.into_iter().collect();
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
