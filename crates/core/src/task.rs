// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: the stable identity for one user request.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a task, formatted `task-YYYYMMDD-HHMMSS-<rand>`.
    pub struct TaskId;
}

const RAND_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

impl TaskId {
    /// Generate a new id from the given clock, in the
    /// `task-YYYYMMDD-HHMMSS-<3-5 lowercase base36>` format.
    pub fn generate(clock: &dyn Clock) -> Self {
        let now = clock.now();
        let suffix = random_suffix();
        Self::new(format!("task-{}-{}", now.format("%Y%m%d-%H%M%S"), suffix))
    }
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    let len = rng.random_range(3..=5);
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..RAND_ALPHABET.len());
            RAND_ALPHABET[idx] as char
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Planning,
    Developing,
    Reviewing,
    Paused,
    Waiting,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    User,
    Selfdrive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTiming {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TaskTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub retry_count: u32,
    pub source: TaskSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub output: TaskOutput,
}

impl Task {
    pub fn new(
        clock: &dyn Clock,
        title: impl Into<String>,
        description: impl Into<String>,
        source: TaskSource,
    ) -> Self {
        let now = clock.now();
        Self {
            id: TaskId::generate(clock),
            title: title.into(),
            description: description.into(),
            priority: TaskPriority::default(),
            status: TaskStatus::Pending,
            retry_count: 0,
            source,
            created_at: now,
            updated_at: now,
            workflow_id: None,
            output: TaskOutput::default(),
        }
    }

    pub fn touch(&mut self, clock: &dyn Clock) {
        self.updated_at = clock.now();
    }

    pub fn set_status(&mut self, clock: &dyn Clock, status: TaskStatus) {
        self.status = status;
        self.touch(clock);
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
