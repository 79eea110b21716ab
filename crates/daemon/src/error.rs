// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-local error type. Converts into [`oj_core::OjError`] at the
//! boundary (control socket responses, CLI-facing errors).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Core(#[from] oj_core::OjError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process {pid} is not running")]
    ProcessNotRunning { pid: u32 },

    #[error("task {0} has no recorded process")]
    NoProcess(String),

    #[error("runner lock held by another daemon")]
    RunnerLockHeld,

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type DaemonResult<T> = Result<T, DaemonError>;
