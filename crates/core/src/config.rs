// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide configuration, loaded once and treated as an immutable
//! snapshot per process (§9 "Global state").

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_data_root() -> PathBuf {
    dirs_data_root()
}

fn dirs_data_root() -> PathBuf {
    std::env::var_os("CAH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".cah-data"))
                .unwrap_or_else(|| PathBuf::from(".cah-data"))
        })
}

fn default_llm_binary() -> String {
    "claude".into()
}

fn default_llm_concurrency() -> usize {
    5
}

fn default_worker_concurrency() -> usize {
    3
}

fn default_stale_lock_secs() -> u64 {
    30
}

fn default_lock_retry_sleep_ms() -> u64 {
    100
}

fn default_lock_max_attempts() -> u32 {
    50
}

fn default_task_poll_ms() -> u64 {
    500
}

fn default_signal_detection_mins() -> u64 {
    30
}

fn default_wait_recovery_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_root: PathBuf,
    pub llm_binary: String,
    pub default_model: Option<String>,
    pub llm_concurrency: usize,
    pub worker_concurrency: usize,
    pub stale_lock_secs: u64,
    pub lock_retry_sleep_ms: u64,
    pub lock_max_attempts: u32,
    pub task_poll_ms: u64,
    pub signal_detection_mins: u64,
    pub wait_recovery_secs: u64,
    pub evolution_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            llm_binary: default_llm_binary(),
            default_model: None,
            llm_concurrency: default_llm_concurrency(),
            worker_concurrency: default_worker_concurrency(),
            stale_lock_secs: default_stale_lock_secs(),
            lock_retry_sleep_ms: default_lock_retry_sleep_ms(),
            lock_max_attempts: default_lock_max_attempts(),
            task_poll_ms: default_task_poll_ms(),
            signal_detection_mins: default_signal_detection_mins(),
            wait_recovery_secs: default_wait_recovery_secs(),
            evolution_command: None,
        }
    }
}

impl Config {
    /// Load from `path` if it exists, falling back to defaults for any
    /// field it doesn't set; `CAH_CONFIG` overrides `path` when set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = std::env::var_os("CAH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| path.as_ref().to_path_buf());
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&text)?;
        Ok(config)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.data_root.join("tasks")
    }

    pub fn queue_path(&self) -> PathBuf {
        self.data_root.join("queue.json")
    }

    pub fn runner_lock_path(&self) -> PathBuf {
        self.data_root.join("runner.lock")
    }

    pub fn daemon_pid_path(&self) -> PathBuf {
        self.data_root.join("daemon.pid")
    }

    pub fn daemon_socket_path(&self) -> PathBuf {
        self.data_root.join("daemon.sock")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
