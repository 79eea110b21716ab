// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative workflow document parsing (TOML, HCL, and JSON), compiling a
//! [`WorkflowDoc`] into the `oj-core` execution graph.

use indexmap::IndexMap;
use oj_core::workflow::{NodeConfig, WorkflowSettings};
use oj_core::{Edge, EdgeId, Node, NodeId, OjError, Workflow, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::slug::derived_id;

/// Declarative document source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Hcl,
    Json,
}

impl Format {
    /// Guesses the format from a file extension (`.toml`, `.hcl`, `.json`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "toml" => Some(Self::Toml),
            "hcl" => Some(Self::Hcl),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document defines no nodes")]
    Empty,

    #[error(transparent)]
    Compile(#[from] OjError),
}

/// One outgoing transition from a node, named by its target's document key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextDoc {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A node block: its `oj-core` configuration plus the transitions leaving it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoc {
    #[serde(flatten)]
    pub config: NodeConfig,
    #[serde(default)]
    pub next: Vec<NextDoc>,
}

/// Top-level declarative workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub settings: WorkflowSettings,
    pub nodes: IndexMap<String, NodeDoc>,
}

fn default_version() -> u32 {
    1
}

/// Parses `content` as `format` into a [`WorkflowDoc`].
pub fn parse(content: &str, format: Format) -> Result<WorkflowDoc, ParseError> {
    let doc = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
        Format::Hcl => hcl::from_str(content)?,
    };
    Ok(doc)
}

/// Compiles a parsed document into an executable [`Workflow`] for `task_id`.
///
/// Node ids are taken verbatim from the document's node keys (they're
/// already valid map keys); edge ids are derived from the `from`/`to` pair
/// so they stay stable across re-parses of the same document.
pub fn compile(doc: WorkflowDoc, workflow_id: impl Into<String>, task_id: impl Into<String>) -> Result<Workflow, ParseError> {
    if doc.nodes.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut nodes = Vec::with_capacity(doc.nodes.len());
    let mut edges = Vec::new();
    for (key, node_doc) in &doc.nodes {
        nodes.push(Node {
            id: NodeId::new(key.clone()),
            name: key.clone(),
            config: node_doc.config.clone(),
        });
        for next in &node_doc.next {
            let edge_id = derived_id(&format!("{key}-{}", next.to), "e");
            edges.push(Edge {
                id: EdgeId::new(edge_id),
                from: NodeId::new(key.clone()),
                to: NodeId::new(next.to.clone()),
                condition: next.when.clone(),
                label: next.label.clone(),
            });
        }
    }

    let workflow = Workflow {
        id: WorkflowId::new(workflow_id.into()),
        task_id: task_id.into(),
        name: doc.name.unwrap_or_default(),
        description: doc.description,
        version: doc.version,
        nodes,
        edges,
        variables: doc.variables,
        inputs: doc.inputs,
        outputs: doc.outputs,
        settings: doc.settings,
    };
    workflow.validate()?;
    Ok(workflow)
}

/// Parses and compiles `content` in one step.
pub fn parse_workflow(
    content: &str,
    format: Format,
    workflow_id: impl Into<String>,
    task_id: impl Into<String>,
) -> Result<Workflow, ParseError> {
    let doc = parse(content, format)?;
    compile(doc, workflow_id, task_id)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
