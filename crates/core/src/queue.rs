// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue data model: one `Job` per `(instance, node)` execution attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct QueueJobId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Waiting,
    Running,
    Completed,
    Failed,
    HumanWaiting,
}

impl JobStatus {
    /// §8 invariant 2: `waiting -> (running -> (completed|failed|human_waiting)) | cancelled`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Waiting, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, HumanWaiting)
                | (HumanWaiting, Running)
                | (Failed, Waiting)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub workflow_id: String,
    pub instance_id: String,
    pub node_id: String,
    #[serde(default = "default_attempt")]
    pub attempt: u32,
}

fn default_attempt() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: QueueJobId,
    pub data: JobData,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: QueueJobId, data: JobData, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            data,
            status: JobStatus::Waiting,
            created_at,
            completed_at: None,
        }
    }

    /// True if this job occupies the same `(instance, node)` slot as `other`
    /// and is in a non-terminal state — used to enforce the §3 invariant
    /// that at most one job per `(instanceId, nodeId)` is non-terminal.
    pub fn conflicts_with(&self, other: &JobData) -> bool {
        !self.status.is_terminal()
            && self.data.instance_id == other.instance_id
            && self.data.node_id == other.node_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueFile {
    #[serde(default)]
    pub jobs: Vec<Job>,
    pub updated_at: DateTime<Utc>,
}

impl QueueFile {
    pub fn empty(updated_at: DateTime<Utc>) -> Self {
        Self {
            jobs: Vec::new(),
            updated_at,
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
