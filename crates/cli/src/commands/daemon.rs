// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj start` / `oj stop` / `oj status`: daemon process lifecycle.

use std::time::Duration;

use oj_core::Config;

use crate::client::DaemonClient;
use crate::daemon_process::{probe_socket, stop_daemon};
use crate::output::OutputFormat;

pub async fn start(config: &Config, config_path: &std::path::Path) -> anyhow::Result<()> {
    let socket_path = config.daemon_socket_path();
    if probe_socket(&socket_path) {
        println!("daemon already running");
        return Ok(());
    }
    DaemonClient::connect_or_start(socket_path, &config.daemon_pid_path(), config_path).await?;
    println!("daemon started");
    Ok(())
}

pub async fn stop(config: &Config) -> anyhow::Result<()> {
    let pid_path = config.daemon_pid_path();
    if stop_daemon(&pid_path, Duration::from_secs(5)).await {
        println!("daemon stopped");
    } else {
        println!("daemon not running");
    }
    Ok(())
}

pub async fn status(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let socket_path = config.daemon_socket_path();
    let running = probe_socket(&socket_path);
    match DaemonClient::connect(socket_path) {
        Ok(client) if running => {
            let data = client.self_check().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "running": true, "self_check": data }))?),
                OutputFormat::Text => {
                    println!("daemon: running");
                    if let Some(orphaned) = data.get("orphaned_tasks").and_then(|v| v.as_array()) {
                        if !orphaned.is_empty() {
                            println!("orphaned tasks: {}", orphaned.len());
                        }
                    }
                }
            }
        }
        _ => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "running": false }))?),
            OutputFormat::Text => println!("daemon: not running"),
        },
    }
    Ok(())
}
