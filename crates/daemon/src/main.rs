// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Odd Jobs Daemon (ojd)
//!
//! Background process that drains the job queue, supervises per-task
//! subprocesses, runs the scheduled cron jobs, and answers the CLI's
//! control-plane requests over a local Unix socket.
//!
//! `ojd task-run --task-id <id>` is the other face of this binary: the
//! per-task subprocess the supervisor spawns, which drives exactly one
//! task's workflow instance to completion (or until it parks) and exits.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use oj_adapters::llm::ClaudeInvoker;
use oj_core::{Config, EventBus, JobStatus, SystemClock, TaskId};
use oj_daemon::scheduler::{DaemonScheduler, SchedulerConfig};
use oj_daemon::{socket_path_from_data_root, ControlServer, Supervisor, WorkerPool};
use oj_storage::{FsStoreIo, QueueStore, StoreIo, TaskStore};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ojd", about = "Odd Jobs Daemon — background process that drains the job queue and supervises task subprocesses", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the TOML config file (default: $CAH_DATA_DIR or ~/.cah-data/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon (default when no subcommand is given).
    Run,
    /// Drive one task's workflow instance to completion, then exit. Spawned
    /// by the supervisor, not meant to be run by hand.
    TaskRun {
        #[arg(long)]
        task_id: String,
        /// Recover a `running` node left behind by a crashed prior attempt
        /// before resuming normal dispatch.
        #[arg(long)]
        resume: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = Config::load(&config_path)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(config).await,
        Command::TaskRun { task_id, resume } => run_task(config, TaskId::new(task_id), resume).await,
    }
}

async fn run_daemon(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = setup_logging(&config);
    info!("starting ojd");

    std::fs::create_dir_all(&config.data_root)?;
    std::fs::create_dir_all(config.tasks_dir())?;
    std::fs::write(config.daemon_pid_path(), std::process::id().to_string())?;

    let io: Arc<dyn StoreIo> = Arc::new(FsStoreIo);
    let task_store = Arc::new(TaskStore::new(config.tasks_dir(), Arc::clone(&io)));
    let queue = Arc::new(QueueStore::new(config.queue_path(), config.data_root.join("queue.json.lock"), Arc::clone(&io)));
    let clock: Arc<dyn oj_core::Clock> = Arc::new(SystemClock);
    let llm: Arc<dyn oj_adapters::llm::LlmInvoker> = Arc::new(ClaudeInvoker::new(config.llm_binary.clone(), config.llm_concurrency));
    let events = EventBus::new();
    let supervisor = Arc::new(Supervisor::new(config.data_root.clone(), Arc::clone(&task_store), Arc::clone(&io), Arc::clone(&clock)));

    let worker_pool = Arc::new(WorkerPool::new(
        config.worker_concurrency,
        Arc::clone(&queue),
        Arc::clone(&task_store),
        Arc::clone(&clock),
        llm,
        events,
    ));

    let scheduler_config = SchedulerConfig {
        wait_recovery: std::time::Duration::from_secs(config.wait_recovery_secs),
        orphan_detection: std::time::Duration::from_secs(config.signal_detection_mins * 60),
        evolution_cycle: None,
        evolution_command: config.evolution_command.clone(),
    };
    let scheduler = Arc::new(DaemonScheduler::new(scheduler_config, Arc::clone(&supervisor), Arc::clone(&task_store), Arc::clone(&clock)));

    let control_server = Arc::new(ControlServer::new(
        socket_path_from_data_root(&config.data_root),
        config.data_root.clone(),
        Arc::clone(&task_store),
        Arc::clone(&queue),
        Arc::clone(&supervisor),
        Arc::clone(&clock),
    ));

    let cancel = CancellationToken::new();
    let mut handles = worker_pool.spawn(cancel.clone());
    handles.extend(scheduler.spawn(cancel.clone()));

    let socket_handle = {
        let server = Arc::clone(&control_server);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = server.serve(cancel).await {
                error!(error = %err, "control socket listener exited");
            }
        })
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    let _ = socket_handle.await;
    let _ = std::fs::remove_file(config.daemon_pid_path());
    info!("ojd stopped");
    Ok(())
}

/// Resumes a crashed task's workflow (if `--resume`), then drains only that
/// task's jobs to completion. This is the whole lifetime of an `ojd
/// task-run` subprocess.
async fn run_task(config: Config, task_id: TaskId, resume: bool) -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = setup_logging(&config);
    info!(task_id = %task_id, resume, "task subprocess starting");

    let io: Arc<dyn StoreIo> = Arc::new(FsStoreIo);
    let task_store = Arc::new(TaskStore::new(config.tasks_dir(), Arc::clone(&io)));
    let queue = Arc::new(QueueStore::new(config.queue_path(), config.data_root.join("queue.json.lock"), Arc::clone(&io)));
    let clock: Arc<dyn oj_core::Clock> = Arc::new(SystemClock);
    let llm: Arc<dyn oj_adapters::llm::LlmInvoker> = Arc::new(ClaudeInvoker::new(config.llm_binary.clone(), config.llm_concurrency));
    let events = EventBus::new();

    if resume {
        recover_task(&task_id, &task_store, &queue, &*clock)?;
    }

    let worker_pool = WorkerPool::new(1, Arc::clone(&queue), Arc::clone(&task_store), Arc::clone(&clock), llm, events);
    worker_pool.run_task_to_completion(&task_id).await?;
    info!(task_id = %task_id, "task subprocess finished");
    Ok(())
}

/// Resets any node a crashed prior attempt left `running`, re-enqueues the
/// nodes that frees up, and resets this task's own `running` queue jobs back
/// to `waiting` so [`WorkerPool::run_task_to_completion`] can reclaim them.
fn recover_task(
    task_id: &TaskId,
    task_store: &TaskStore,
    queue: &QueueStore,
    clock: &dyn oj_core::Clock,
) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = task_store
        .get_workflow(task_id)?
        .ok_or_else(|| oj_core::OjError::NotFound(format!("workflow for task {task_id}")))?;
    let mut instance = task_store
        .get_instance(task_id)?
        .ok_or_else(|| oj_core::OjError::NotFound(format!("instance for task {task_id}")))?;

    let ready = oj_engine::recover_on_start(clock, &workflow, &mut instance);
    task_store.save_instance(task_id, &instance)?;

    queue.with_queue(|file| {
        for job in file.jobs.iter_mut() {
            if job.data.workflow_id == task_id.as_str() && job.status == JobStatus::Running {
                job.status = JobStatus::Waiting;
            }
        }
        file.updated_at = clock.now();
    })?;

    for node_id in ready {
        let data = oj_core::JobData {
            workflow_id: task_id.to_string(),
            instance_id: instance.id.to_string(),
            node_id: node_id.to_string(),
            attempt: 1,
        };
        if queue.all()?.iter().any(|j| j.conflicts_with(&data)) {
            continue;
        }
        queue.enqueue(clock, data)?;
    }
    Ok(())
}

/// Logs to both stdout and a daily-rolling file under the data root. Falls
/// back to stdout-only if the log directory can't be created.
fn setup_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config.data_root.join("logs");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!("warn: could not create log directory '{}': {err} — falling back to stdout", log_dir.display());
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&log_dir, "ojd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Some(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
