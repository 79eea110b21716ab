//! CLI help output specs.

use crate::prelude::*;

#[test]
fn oj_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn oj_no_args_fails_with_usage() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn oj_task_help_shows_subcommands() {
    cli()
        .args(&["task", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("logs")
        .stdout_has("resume");
}

#[test]
fn oj_workflow_help_shows_subcommands() {
    cli()
        .args(&["workflow", "--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("status");
}

#[test]
fn oj_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
