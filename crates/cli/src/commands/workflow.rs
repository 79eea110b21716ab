// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj workflow ...`: attach a workflow document to a task and inspect it.

use std::path::Path;

use oj_core::Config;

use crate::client::DaemonClient;
use crate::output::{print_value, OutputFormat};

pub async fn create(
    config: &Config,
    config_path: &Path,
    task_id: &str,
    file: &Path,
    format_hint: Option<&str>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let document = std::fs::read_to_string(file)?;
    let format = format_hint
        .map(str::to_string)
        .or_else(|| file.extension().and_then(|e| e.to_str()).map(str::to_string))
        .ok_or_else(|| anyhow::anyhow!("cannot determine workflow format; pass --format"))?;

    let client = DaemonClient::connect_or_start(config.daemon_socket_path(), &config.daemon_pid_path(), config_path).await?;
    let data = client.workflow_create(task_id, document, &format).await?;
    print_value(output, &data, |value| {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
    });
    Ok(())
}

pub async fn status(config: &Config, task_id: &str, output: OutputFormat) -> anyhow::Result<()> {
    let client = DaemonClient::connect(config.daemon_socket_path())?;
    let data = client.workflow_status(task_id).await?;
    print_value(output, &data, |value| {
        let status = value.get("status").and_then(|v| v.as_str()).unwrap_or("?");
        println!("status: {status}");
        if let Some(nodes) = value.get("node_states").and_then(|v| v.as_object()) {
            for (node_id, state) in nodes {
                let node_status = state.get("status").and_then(|v| v.as_str()).unwrap_or("?");
                println!("  {node_id}: {node_status}");
            }
        }
    });
    Ok(())
}
