// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj self check`: ask the daemon to scan for orphaned task subprocesses.

use oj_core::Config;

use crate::client::DaemonClient;
use crate::output::{print_value, OutputFormat};

pub async fn check(config: &Config, config_path: &std::path::Path, output: OutputFormat) -> anyhow::Result<()> {
    let client = DaemonClient::connect_or_start(config.daemon_socket_path(), &config.daemon_pid_path(), config_path).await?;
    let data = client.self_check().await?;
    print_value(output, &data, |value| {
        let orphaned = value.get("orphaned_tasks").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        if orphaned.is_empty() {
            println!("no orphaned tasks");
        } else {
            println!("orphaned tasks:");
            for task in orphaned {
                if let Some(id) = task.as_str() {
                    println!("  {id}");
                }
            }
        }
    });
    Ok(())
}
