// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj`: the command-line client for the `ojd` daemon — start/stop the
//! daemon, inspect and control tasks, attach workflow documents, and run
//! the orphan-detection self-check.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod daemon_process;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use oj_core::Config;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "oj", about = "Control the odd-jobs daemon and the tasks it runs", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the TOML config file (default: $CAH_DATA_DIR or ~/.cah-data/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon in the background if it isn't already running.
    Start,
    /// Stop the running daemon.
    Stop,
    /// Show whether the daemon is running and whether it sees orphaned tasks.
    Status,
    /// Inspect and control tasks.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Attach a workflow document to a task, or inspect its run status.
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommand,
    },
    /// Self-diagnostics.
    #[command(name = "self")]
    SelfCmd {
        #[command(subcommand)]
        command: SelfCommand,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List all known tasks.
    List,
    /// Show one task's details.
    Get { task_id: String },
    /// Show a task's execution log.
    Logs {
        task_id: String,
        /// Number of most recent lines to show.
        #[arg(long, default_value_t = 100)]
        lines: usize,
        /// Keep printing new lines as they're written.
        #[arg(long)]
        follow: bool,
    },
    /// Mark a running task stopped.
    Stop { task_id: String },
    /// Resume a stopped or crashed task.
    Resume { task_id: String },
    /// Pause a running task.
    Pause { task_id: String },
}

#[derive(Subcommand)]
enum WorkflowCommand {
    /// Parse a workflow document and start driving it for a task.
    Create {
        task_id: String,
        /// Path to the workflow document.
        #[arg(long)]
        file: PathBuf,
        /// Document format (toml, hcl, json). Inferred from the file
        /// extension when omitted.
        #[arg(long)]
        format: Option<String>,
    },
    /// Show a task's workflow instance status.
    Status { task_id: String },
}

#[derive(Subcommand)]
enum SelfCommand {
    /// Scan for task subprocesses whose supervisor record is stale.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = Config::load(&config_path)?;

    match args.command {
        Command::Start => commands::daemon::start(&config, &config_path).await,
        Command::Stop => commands::daemon::stop(&config).await,
        Command::Status => commands::daemon::status(&config, args.output).await,
        Command::Task { command } => match command {
            TaskCommand::List => commands::task::list(&config, args.output).await,
            TaskCommand::Get { task_id } => commands::task::get(&config, &task_id, args.output).await,
            TaskCommand::Logs { task_id, lines, follow } => commands::task::logs(&config, &task_id, lines, follow, args.output).await,
            TaskCommand::Stop { task_id } => commands::task::stop(&config, &config_path, &task_id).await,
            TaskCommand::Resume { task_id } => commands::task::resume(&config, &config_path, &task_id).await,
            TaskCommand::Pause { task_id } => commands::task::pause(&config, &config_path, &task_id).await,
        },
        Command::Workflow { command } => match command {
            WorkflowCommand::Create { task_id, file, format } => {
                commands::workflow::create(&config, &config_path, &task_id, &file, format.as_deref(), args.output).await
            }
            WorkflowCommand::Status { task_id } => commands::workflow::status(&config, &task_id, args.output).await,
        },
        Command::SelfCmd { command } => match command {
            SelfCommand::Check => commands::self_check::check(&config, &config_path, args.output).await,
        },
    }
}
