// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow: the DAG plan for one task.

use crate::error::{OjError, OjResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};

crate::define_id! {
    pub struct WorkflowId;
}

crate::define_id! {
    pub struct NodeId;
}

crate::define_id! {
    pub struct EdgeId;
}

/// Retry policy attached to task-like nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "RetryPolicy::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_ms: u64,
}

impl RetryPolicy {
    fn default_max_attempts() -> u32 {
        3
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub path: String,
    pub value: Value,
    #[serde(default)]
    pub is_expression: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Value,
    pub target: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    While,
    Until,
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeachMode {
    Sequential,
    Parallel,
}

/// Per-node-type configuration. Mirrors §4.3's table one variant per type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeConfig {
    Start,
    End,
    Task {
        persona: Option<String>,
        prompt: String,
        model: Option<String>,
        #[serde(default)]
        retry: RetryPolicy,
        #[serde(default)]
        stream: bool,
    },
    Condition,
    Parallel,
    Join,
    Human {
        prompt: String,
    },
    Delay {
        value: f64,
        unit: DelayUnit,
    },
    Schedule {
        #[serde(skip_serializing_if = "Option::is_none")]
        datetime: Option<chrono::DateTime<chrono::Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cron: Option<String>,
    },
    Switch {
        expression: String,
        cases: Vec<SwitchCase>,
        #[serde(default)]
        default: Option<NodeId>,
    },
    Assign {
        assignments: Vec<Assignment>,
    },
    Script {
        #[serde(skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output_var: Option<String>,
        #[serde(default)]
        assignments: Vec<Assignment>,
    },
    Loop {
        mode: LoopMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        count: Option<u64>,
        body: NodeId,
        #[serde(default = "default_max_iterations")]
        max_iterations: u64,
    },
    Foreach {
        collection: String,
        item_var: String,
        #[serde(default)]
        index_var: Option<String>,
        body: NodeId,
        #[serde(default)]
        mode: ForeachMode,
        #[serde(default)]
        max_parallel: Option<u32>,
    },
}

fn default_max_iterations() -> u64 {
    1000
}

impl Default for ForeachMode {
    fn default() -> Self {
        Self::Sequential
    }
}

impl NodeConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Task { .. } => "task",
            Self::Condition => "condition",
            Self::Parallel => "parallel",
            Self::Join => "join",
            Self::Human { .. } => "human",
            Self::Delay { .. } => "delay",
            Self::Schedule { .. } => "schedule",
            Self::Switch { .. } => "switch",
            Self::Assign { .. } => "assign",
            Self::Script { .. } => "script",
            Self::Loop { .. } => "loop",
            Self::Foreach { .. } => "foreach",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    S,
    M,
    H,
    D,
}

impl DelayUnit {
    pub fn factor_ms(self) -> f64 {
        match self {
            Self::S => 1_000.0,
            Self::M => 60_000.0,
            Self::H => 3_600_000.0,
            Self::D => 86_400_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(flatten)]
    pub config: NodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowSettings {
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub task_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub settings: WorkflowSettings,
}

fn default_version() -> u32 {
    1
}

impl Workflow {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn start_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| matches!(n.config, NodeConfig::Start))
    }

    pub fn incoming_edges<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.to == id)
    }

    pub fn outgoing_edges<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.from == id)
    }

    /// Validate the structural invariants from §3: exactly one `start`, at
    /// least one `end`, every node reachable from `start`, every edge
    /// endpoint references an existing node, and loop/foreach/switch body
    /// references exist.
    pub fn validate(&self) -> OjResult<()> {
        let start_nodes: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| matches!(n.config, NodeConfig::Start))
            .collect();
        if start_nodes.len() != 1 {
            return Err(OjError::InvalidState(format!(
                "workflow must have exactly one start node, found {}",
                start_nodes.len()
            )));
        }
        let end_count = self
            .nodes
            .iter()
            .filter(|n| matches!(n.config, NodeConfig::End))
            .count();
        if end_count == 0 {
            return Err(OjError::InvalidState(
                "workflow must have at least one end node".into(),
            ));
        }

        let ids: HashSet<&NodeId> = self.nodes.iter().map(|n| &n.id).collect();
        for edge in &self.edges {
            if !ids.contains(&edge.from) {
                return Err(OjError::InvalidState(format!(
                    "edge {} references unknown source node {}",
                    edge.id, edge.from
                )));
            }
            if !ids.contains(&edge.to) {
                return Err(OjError::InvalidState(format!(
                    "edge {} references unknown target node {}",
                    edge.id, edge.to
                )));
            }
        }

        for node in &self.nodes {
            match &node.config {
                NodeConfig::Loop { body, .. } | NodeConfig::Foreach { body, .. } => {
                    if !ids.contains(body) {
                        return Err(OjError::InvalidState(format!(
                            "node {} references unknown body node {}",
                            node.id, body
                        )));
                    }
                }
                NodeConfig::Switch { cases, default, .. } => {
                    for case in cases {
                        if !ids.contains(&case.target) {
                            return Err(OjError::InvalidState(format!(
                                "switch node {} references unknown case target {}",
                                node.id, case.target
                            )));
                        }
                    }
                    if let Some(d) = default {
                        if !ids.contains(d) {
                            return Err(OjError::InvalidState(format!(
                                "switch node {} references unknown default target {}",
                                node.id, d
                            )));
                        }
                    }
                }
                _ => {}
            }
        }

        let start = start_nodes[0];
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(&start.id);
        seen.insert(&start.id);
        while let Some(id) = queue.pop_front() {
            for edge in self.outgoing_edges(id) {
                if seen.insert(&edge.to) {
                    queue.push_back(&edge.to);
                }
            }
            if let Some(node) = self.node(id) {
                match &node.config {
                    NodeConfig::Loop { body, .. } | NodeConfig::Foreach { body, .. } => {
                        if seen.insert(body) {
                            queue.push_back(body);
                        }
                    }
                    _ => {}
                }
            }
        }
        if seen.len() != self.nodes.len() {
            let unreachable: Vec<_> = self
                .nodes
                .iter()
                .filter(|n| !seen.contains(&n.id))
                .map(|n| n.id.to_string())
                .collect();
            return Err(OjError::InvalidState(format!(
                "unreachable nodes from start: {unreachable:?}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
