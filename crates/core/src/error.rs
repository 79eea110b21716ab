// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the orchestration core.
//!
//! Each crate defines a local error enum for its own boundary and converts
//! into this one (`#[from]`) when the error crosses into shared code such as
//! the CLI or the daemon's IPC responses.

use thiserror::Error;

/// Core-wide error type. Names mirror the error kinds named by the system
/// design: each variant is something a caller can branch on, not just a
/// formatted message.
#[derive(Debug, Error)]
pub enum OjError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous id prefix {prefix:?} matches {matches:?}")]
    AmbiguousPrefix { prefix: String, matches: Vec<String> },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("could not acquire lock {path:?} within {attempts} attempts")]
    LockTimeout { path: String, attempts: u32 },

    #[error("corrupt file {path:?}: {message}")]
    Corrupt { path: String, message: String },

    #[error("llm invocation timed out after {0:?}")]
    LlmTimeout(std::time::Duration),

    #[error("llm invocation cancelled")]
    LlmCancelled,

    #[error("llm process error (exit code {exit_code:?}): {message}")]
    LlmProcess {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("expression error: {0}")]
    Expression(String),

    #[error("node {node_id} failed: {message}")]
    NodeFailed { node_id: String, message: String },

    #[error("workflow failed: {0}")]
    WorkflowFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type OjResult<T> = Result<T, OjError>;
