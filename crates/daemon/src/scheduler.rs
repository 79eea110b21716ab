// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-side cron loop: each job runs as its own `tokio::time::interval`
//! task so one job's failure (or panic) can never stop the others — every
//! tick is wrapped in `run_guarded`, which logs and swallows the error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use oj_core::{Clock, TaskStatus};
use oj_storage::TaskStore;
use tokio_util::sync::CancellationToken;

use crate::supervisor::Supervisor;

/// Runs `fut` once, logging (but not propagating) any error so the calling
/// interval loop keeps ticking.
async fn run_guarded<F>(job_name: &str, fut: F)
where
    F: Future<Output = Result<(), crate::error::DaemonError>>,
{
    if let Err(err) = fut.await {
        tracing::error!(job = job_name, error = %err, "scheduled job failed");
    }
}

/// Cadence and enabled-ness for each cron job this daemon runs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub orphan_detection: Duration,
    pub wait_recovery: Duration,
    pub evolution_cycle: Option<Duration>,
    pub evolution_command: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            orphan_detection: Duration::from_secs(30 * 60),
            wait_recovery: Duration::from_secs(60),
            evolution_cycle: None,
            evolution_command: None,
        }
    }
}

/// Owns the set of independent cron loops the daemon runs alongside the
/// worker pool: orphan detection/auto-repair, schedule-wait recovery, and
/// (when configured) the evolution-cycle hook.
pub struct DaemonScheduler {
    config: SchedulerConfig,
    supervisor: Arc<Supervisor>,
    task_store: Arc<TaskStore>,
    clock: Arc<dyn Clock>,
}

impl DaemonScheduler {
    pub fn new(config: SchedulerConfig, supervisor: Arc<Supervisor>, task_store: Arc<TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            supervisor,
            task_store,
            clock,
        }
    }

    /// Spawns every cron loop; each runs until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let me = Arc::clone(&self);
        let c = cancel.clone();
        handles.push(tokio::spawn(async move {
            me.interval_loop("orphan_detection", me.config.orphan_detection, c, |s| Box::pin(s.run_orphan_detection()))
                .await
        }));

        let me = Arc::clone(&self);
        let c = cancel.clone();
        handles.push(tokio::spawn(async move {
            me.interval_loop("wait_recovery", me.config.wait_recovery, c, |s| Box::pin(s.run_wait_recovery()))
                .await
        }));

        if let Some(period) = self.config.evolution_cycle {
            let me = Arc::clone(&self);
            handles.push(tokio::spawn(async move {
                me.interval_loop("evolution_cycle", period, cancel, |s| Box::pin(s.run_evolution_cycle()))
                    .await
            }));
        }

        handles
    }

    async fn interval_loop<F>(&self, name: &'static str, period: Duration, cancel: CancellationToken, job: F)
    where
        F: for<'a> Fn(&'a Self) -> std::pin::Pin<Box<dyn Future<Output = Result<(), crate::error::DaemonError>> + Send + 'a>>,
    {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => run_guarded(name, job(self)).await,
            }
        }
    }

    /// Detects orphaned (process-dead but still `Running`) tasks and
    /// respawns their subprocess so they resume from their last checkpoint.
    async fn run_orphan_detection(&self) -> Result<(), crate::error::DaemonError> {
        for task_id in self.supervisor.detect_orphaned_tasks()? {
            tracing::warn!(task_id = %task_id, "orphaned task detected, resuming");
            self.supervisor.resume_task(&task_id)?;
        }
        Ok(())
    }

    /// Finds tasks parked in `Waiting` whose workflow instance's outstanding
    /// `schedule`/`delay` node has already fired, and resumes them so the
    /// subprocess can apply the external transition.
    async fn run_wait_recovery(&self) -> Result<(), crate::error::DaemonError> {
        let now = self.clock.now();
        for task in self.task_store.get_tasks_by_status(TaskStatus::Waiting)? {
            let Some(instance) = self.task_store.get_instance(&task.id)? else { continue };
            let Some(workflow) = self.task_store.get_workflow(&task.id)? else { continue };
            let due = workflow.nodes.iter().any(|node| {
                let state = instance.node_state(&node.id);
                state.status() == oj_core::instance::NodeStatus::Waiting
                    && matches!(&node.config, oj_core::workflow::NodeConfig::Schedule { datetime: Some(at), .. } if *at <= now)
            });
            if due {
                tracing::info!(task_id = %task.id, "schedule wait recovered, resuming");
                self.supervisor.resume_task(&task.id)?;
            }
        }
        Ok(())
    }

    /// Out of scope to implement: this is the hook point only. When
    /// configured, shells out to the external analytics binary and ignores
    /// its output beyond logging success/failure.
    async fn run_evolution_cycle(&self) -> Result<(), crate::error::DaemonError> {
        let Some(command) = &self.config.evolution_command else {
            return Ok(());
        };
        let status = tokio::process::Command::new(command).status().await?;
        if !status.success() {
            tracing::warn!(command, ?status, "evolution cycle command exited non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
