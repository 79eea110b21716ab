// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ProcessInfo: liveness record for a task's supervising subprocess.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Stopped,
    Crashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub status: ProcessStatus,
}

impl ProcessInfo {
    pub fn new(pid: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            pid,
            started_at,
            status: ProcessStatus::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_process_info_is_running() {
        let info = ProcessInfo::new(1234, Utc::now());
        assert_eq!(info.status, ProcessStatus::Running);
        assert_eq!(info.pid, 1234);
    }
}
