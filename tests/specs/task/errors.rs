//! Task command specs that don't require a running daemon.

use crate::prelude::*;

#[test]
fn task_list_without_a_daemon_fails() {
    let project = Project::empty();

    project.oj().args(&["task", "list"]).fails().stderr_has("daemon not running");
}

#[test]
fn task_get_without_a_daemon_fails() {
    let project = Project::empty();

    project.oj().args(&["task", "get", "some-task"]).fails().stderr_has("daemon not running");
}

#[test]
fn task_get_requires_a_task_id() {
    let project = Project::empty();

    project.oj().args(&["task", "get"]).fails().stderr_has("Usage:");
}

#[test]
fn task_list_reports_empty_once_the_daemon_is_up() {
    let project = Project::empty();

    project.oj().args(&["start"]).passes();
    assert!(wait_for(2000, || project.daemon_socket_path().exists()));

    project.oj().args(&["task", "list"]).passes().stdout_has("no tasks");
}
