// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment handling for spawned processes.
//!
//! Task subprocesses get `CAH_TASK_ID` set so nested `oj` CLI calls know
//! which task they belong to. Nested LLM invocations have recursion-prone
//! variables stripped so a sub-agent doesn't mistake itself for the
//! outer session and loop.

/// Env var prefixes stripped from a spawned LLM CLI's environment to
/// prevent it from detecting (and recursing into) the outer agent session.
const RECURSION_GUARD_PREFIXES: &[&str] = &["CLAUDECODE", "CLAUDE_CODE"];

/// Returns the env vars from the current process that must not be forwarded
/// to a nested LLM invocation.
pub fn recursion_guard_vars() -> Vec<String> {
    std::env::vars()
        .map(|(k, _)| k)
        .filter(|k| RECURSION_GUARD_PREFIXES.iter().any(|p| k.starts_with(p)))
        .collect()
}

/// The env var set on a task's supervising subprocess.
pub const TASK_ID_VAR: &str = "CAH_TASK_ID";

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
