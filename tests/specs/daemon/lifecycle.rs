//! Daemon start/stop/status lifecycle specs.

use crate::prelude::*;

#[test]
fn start_then_status_reports_running() {
    let project = Project::empty();

    project.oj().args(&["start"]).passes().stdout_has("started");

    assert!(wait_for(2000, || project.daemon_socket_path().exists()));

    project.oj().args(&["status"]).passes().stdout_has("running");
}

#[test]
fn status_without_a_daemon_reports_not_running() {
    let project = Project::empty();

    project.oj().args(&["status"]).passes().stdout_has("not running");
}

#[test]
fn stop_without_a_daemon_is_not_an_error() {
    let project = Project::empty();

    project.oj().args(&["stop"]).passes().stdout_has("not running");
}

#[test]
fn start_is_idempotent() {
    let project = Project::empty();

    project.oj().args(&["start"]).passes();
    assert!(wait_for(2000, || project.daemon_socket_path().exists()));

    project.oj().args(&["start"]).passes().stdout_has("already running");
}

#[test]
fn stop_removes_the_pid_file() {
    let project = Project::empty();

    project.oj().args(&["start"]).passes();
    assert!(wait_for(2000, || project.daemon_pid_path().exists()));

    project.oj().args(&["stop"]).passes().stdout_has("stopped");
    assert!(!project.daemon_pid_path().exists());
}
