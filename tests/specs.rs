//! Behavioral specifications for the `oj` CLI.
//!
//! Black-box: invoke the CLI binary and verify stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/help.rs"]
mod cli_help;

// daemon/
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;

// task/
#[path = "specs/task/errors.rs"]
mod task_errors;
