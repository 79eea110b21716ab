// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj task ...`: inspect and control tasks the daemon is driving.

use oj_core::Config;

use crate::client::DaemonClient;
use crate::output::{display_log, print_value, OutputFormat};

fn task_logs_path(config: &Config, task_id: &str) -> std::path::PathBuf {
    config.tasks_dir().join(task_id).join("logs").join("execution.log")
}

pub async fn list(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let client = DaemonClient::connect(config.daemon_socket_path())?;
    let data = client.task_list().await?;
    print_value(format, &data, |value| {
        let Some(tasks) = value.as_array() else { return };
        if tasks.is_empty() {
            println!("no tasks");
            return;
        }
        for task in tasks {
            let id = task.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            let status = task.get("status").and_then(|v| v.as_str()).unwrap_or("?");
            let title = task.get("title").and_then(|v| v.as_str()).unwrap_or("");
            println!("{id:<28} {status:<10} {title}");
        }
    });
    Ok(())
}

pub async fn get(config: &Config, task_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let client = DaemonClient::connect(config.daemon_socket_path())?;
    let data = client.task_get(task_id).await?;
    print_value(format, &data, |value| {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
    });
    Ok(())
}

pub async fn logs(config: &Config, task_id: &str, lines: usize, follow: bool, format: OutputFormat) -> anyhow::Result<()> {
    let client = DaemonClient::connect(config.daemon_socket_path())?;
    let data = client.task_logs(task_id, lines).await?;
    let log_lines: Vec<String> = data
        .as_array()
        .map(|lines| lines.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    // `task_id` may be a prefix; resolve it to the canonical id the daemon
    // already matched against so --follow tails the right file on disk.
    let resolved_id = if follow {
        let task = client.task_get(task_id).await?;
        task.get("id").and_then(|v| v.as_str()).unwrap_or(task_id).to_string()
    } else {
        task_id.to_string()
    };
    display_log(&log_lines, &task_logs_path(config, &resolved_id), follow, format).await
}

pub async fn stop(config: &Config, config_path: &std::path::Path, task_id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect_or_start(config.daemon_socket_path(), &config.daemon_pid_path(), config_path).await?;
    client.task_stop(task_id).await?;
    println!("stopped {task_id}");
    Ok(())
}

pub async fn resume(config: &Config, config_path: &std::path::Path, task_id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect_or_start(config.daemon_socket_path(), &config.daemon_pid_path(), config_path).await?;
    client.task_resume(task_id).await?;
    println!("resumed {task_id}");
    Ok(())
}

pub async fn pause(config: &Config, config_path: &std::path::Path, task_id: &str) -> anyhow::Result<()> {
    let client = DaemonClient::connect_or_start(config.daemon_socket_path(), &config.daemon_pid_path(), config_path).await?;
    client.task_pause(task_id).await?;
    println!("paused {task_id}");
    Ok(())
}
