// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process worker pool: N tokio tasks each polling the job queue,
//! dispatching claimed jobs to the workflow engine, and writing the result
//! back before looping. Mirrors the queue's own lock protocol for claims so
//! two workers never run the same job twice.

use std::sync::Arc;
use std::time::Duration;

use oj_core::{Clock, Event, EventBus, Job, JobStatus, NodeId, TaskId};
use oj_adapters::llm::LlmInvoker;
use oj_engine::executor::ExecutionContext;
use oj_storage::{QueueStore, TaskStore};
use tokio_util::sync::CancellationToken;

const POLL_BACKOFF: Duration = Duration::from_millis(500);

/// Owns the queue and task stores and fans claimed jobs out across
/// `concurrency` worker loops.
pub struct WorkerPool {
    concurrency: usize,
    queue: Arc<QueueStore>,
    task_store: Arc<TaskStore>,
    clock: Arc<dyn Clock>,
    llm: Arc<dyn LlmInvoker>,
    events: EventBus,
}

impl WorkerPool {
    pub fn new(
        concurrency: usize,
        queue: Arc<QueueStore>,
        task_store: Arc<TaskStore>,
        clock: Arc<dyn Clock>,
        llm: Arc<dyn LlmInvoker>,
        events: EventBus,
    ) -> Self {
        Self {
            concurrency: concurrency.max(1),
            queue,
            task_store,
            clock,
            llm,
            events,
        }
    }

    /// Spawns `concurrency` loops; each runs until `cancel` fires.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.concurrency)
            .map(|worker_id| {
                let pool = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move { pool.run_loop(worker_id, cancel).await })
            })
            .collect()
    }

    async fn run_loop(&self, worker_id: usize, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            match self.claim_next() {
                Ok(Some(job)) => self.run_job(job).await,
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(POLL_BACKOFF) => {}
                    }
                }
                Err(err) => {
                    tracing::error!(worker_id, error = %err, "worker failed to claim a job");
                    tokio::time::sleep(POLL_BACKOFF).await;
                }
            }
        }
    }

    /// Atomically transitions the first `waiting` job to `running` under
    /// the queue lock so concurrent workers never double-claim.
    fn claim_next(&self) -> oj_core::OjResult<Option<Job>> {
        let clock = &*self.clock;
        self.queue.with_queue(|queue| {
            let job = queue.jobs.iter_mut().find(|j| j.status == JobStatus::Waiting)?;
            job.status = JobStatus::Running;
            queue.updated_at = clock.now();
            Some(job.clone())
        })
    }

    /// Same claim as [`Self::claim_next`], restricted to jobs belonging to
    /// `task_id`. Used by the `task-run` subprocess, which only drives its
    /// own task's instance rather than draining the whole shared queue.
    fn claim_next_for(&self, task_id: &TaskId) -> oj_core::OjResult<Option<Job>> {
        let clock = &*self.clock;
        self.queue.with_queue(|queue| {
            let job = queue
                .jobs
                .iter_mut()
                .find(|j| j.status == JobStatus::Waiting && j.data.workflow_id == task_id.as_str())?;
            job.status = JobStatus::Running;
            queue.updated_at = clock.now();
            Some(job.clone())
        })
    }

    /// Drains only `task_id`'s jobs until its instance reaches a terminal
    /// status or parks waiting on human input, then returns. This is the
    /// loop the `ojd task-run` subprocess runs, as opposed to [`Self::spawn`]
    /// which drains the whole shared queue across every task.
    pub async fn run_task_to_completion(&self, task_id: &TaskId) -> oj_core::OjResult<()> {
        loop {
            let Some(instance) = self.task_store.get_instance(task_id)? else {
                return Err(oj_core::OjError::NotFound(format!("instance for task {task_id}")));
            };
            if matches!(
                instance.status,
                oj_core::InstanceStatus::Completed | oj_core::InstanceStatus::Failed | oj_core::InstanceStatus::Cancelled
            ) {
                return Ok(());
            }
            match self.claim_next_for(task_id)? {
                Some(job) => self.run_job(job).await,
                None => return Ok(()),
            }
        }
    }

    async fn run_job(&self, job: Job) {
        // The owning task folder is named after the task id, which this
        // daemon enqueues as the job's `workflow_id` field (one workflow per
        // task, so the two ids are kept identical rather than maintaining a
        // separate workflow-id-to-task-id index).
        let task_id = TaskId::new(job.data.workflow_id.clone());
        let node_id = NodeId::new(job.data.node_id.clone());

        let outcome = self.execute(&task_id, &node_id).await;
        let next_status = match &outcome {
            Ok(true) => JobStatus::Completed,
            Ok(false) => JobStatus::HumanWaiting,
            Err(_) => JobStatus::Failed,
        };
        if let Err(err) = self.queue.set_status(&*self.clock, &job.id, next_status) {
            tracing::error!(job_id = %job.id, error = %err, "failed to record job completion");
        }
        if let Err(err) = outcome {
            tracing::warn!(task_id = %task_id, node_id = %node_id, error = %err, "node execution failed");
        }
    }

    /// Runs one node to completion against the task's persisted workflow
    /// and instance, advancing the DAG and persisting the result. Returns
    /// `Ok(false)` when the node parked on a `human` node.
    async fn execute(&self, task_id: &TaskId, node_id: &NodeId) -> oj_core::OjResult<bool> {
        let workflow = self
            .task_store
            .get_workflow(task_id)?
            .ok_or_else(|| oj_core::OjError::NotFound(format!("workflow for task {task_id}")))?;
        let mut instance = self
            .task_store
            .get_instance(task_id)?
            .ok_or_else(|| oj_core::OjError::NotFound(format!("instance for task {task_id}")))?;
        let node = workflow
            .node(node_id)
            .ok_or_else(|| oj_core::OjError::NotFound(format!("node {node_id}")))?;

        oj_engine::begin_node(&*self.clock, &mut instance, node_id);
        self.events.emit(&Event::NodeStarted {
            instance_id: instance.id.to_string(),
            node_id: node_id.to_string(),
        });

        let exec_ctx = ExecutionContext {
            clock: &*self.clock,
            llm: &*self.llm,
        };
        let outcome = oj_engine::execute_node(&exec_ctx, CancellationToken::new(), &workflow, &instance, node).await;
        let waiting = matches!(outcome, oj_engine::NodeOutcome::Waiting);
        let failed_message = if let oj_engine::NodeOutcome::Failed(ref message) = outcome {
            Some(message.clone())
        } else {
            None
        };

        let result = oj_engine::advance(&*self.clock, &workflow, &mut instance, node_id, outcome)?;
        self.task_store.save_instance(task_id, &instance)?;

        if let Some(message) = failed_message {
            self.events.emit(&Event::NodeFailed {
                instance_id: instance.id.to_string(),
                node_id: node_id.to_string(),
                error: message,
            });
        } else if !waiting {
            self.events.emit(&Event::NodeCompleted {
                instance_id: instance.id.to_string(),
                node_id: node_id.to_string(),
            });
        }

        for ready in &result.ready {
            self.queue.enqueue(
                &*self.clock,
                oj_core::JobData {
                    workflow_id: task_id.to_string(),
                    instance_id: instance.id.to_string(),
                    node_id: ready.to_string(),
                    attempt: 1,
                },
            )?;
        }

        if result.instance_status == oj_core::InstanceStatus::Completed {
            self.events.emit(&Event::WorkflowCompleted {
                task_id: task_id.to_string(),
                instance_id: instance.id.to_string(),
            });
            self.events.emit(&Event::TaskCompleted { task_id: task_id.to_string() });
        } else if result.instance_status == oj_core::InstanceStatus::Failed {
            self.events.emit(&Event::WorkflowFailed {
                task_id: task_id.to_string(),
                instance_id: instance.id.to_string(),
                error: instance.error.clone().unwrap_or_default(),
            });
        }

        Ok(!waiting)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
