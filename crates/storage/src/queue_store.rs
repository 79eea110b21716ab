// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global job queue file plus its lock: `queue.json` guarded by
//! `queue.json.lock`, mutated only through [`QueueStore::with_queue`].

use crate::io::StoreIo;
use crate::json_file::{read_json, write_json};
use crate::lock::FileLock;
use oj_core::{Clock, Job, JobData, JobStatus, OjError, OjResult, QueueFile, QueueJobId};
use std::path::PathBuf;
use std::sync::Arc;

pub struct QueueStore {
    queue_path: PathBuf,
    lock: FileLock,
    io: Arc<dyn StoreIo>,
}

impl QueueStore {
    pub fn new(queue_path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>, io: Arc<dyn StoreIo>) -> Self {
        let queue_path = queue_path.into();
        Self {
            lock: FileLock::new(Arc::clone(&io), lock_path.into()),
            queue_path,
            io,
        }
    }

    fn load(&self) -> OjResult<QueueFile> {
        Ok(read_json(&*self.io, &self.queue_path)?.unwrap_or_else(|| QueueFile::empty(chrono::Utc::now())))
    }

    fn save(&self, queue: &QueueFile) -> OjResult<()> {
        write_json(&*self.io, &self.queue_path, queue)
    }

    /// Run `f` against the current queue contents under the queue lock,
    /// persisting whatever `f` returns before releasing.
    pub fn with_queue<R>(&self, f: impl FnOnce(&mut QueueFile) -> R) -> OjResult<R> {
        self.lock.with_lock(|| {
            let mut queue = self.load()?;
            let result = f(&mut queue);
            self.save(&queue)?;
            Ok(result)
        })
    }

    /// Enqueue a new job for `data`, rejecting it if a non-terminal job
    /// already occupies the same `(instanceId, nodeId)` slot.
    pub fn enqueue(&self, clock: &dyn Clock, data: JobData) -> OjResult<Job> {
        self.with_queue(|queue| {
            if queue.jobs.iter().any(|j| j.conflicts_with(&data)) {
                return Err(OjError::InvalidState(format!(
                    "a non-terminal job already exists for instance {} node {}",
                    data.instance_id, data.node_id
                )));
            }
            let job = Job::new(QueueJobId::new(uuid::Uuid::new_v4().to_string()), data, clock.now());
            queue.jobs.push(job.clone());
            queue.updated_at = clock.now();
            Ok(job)
        })?
    }

    pub fn set_status(&self, clock: &dyn Clock, id: &QueueJobId, next: JobStatus) -> OjResult<Job> {
        self.with_queue(|queue| {
            let job = queue
                .jobs
                .iter_mut()
                .find(|j| &j.id == id)
                .ok_or_else(|| OjError::NotFound(id.as_str().to_string()))?;
            if !job.status.can_transition_to(next) {
                return Err(OjError::InvalidState(format!(
                    "cannot transition job {} from {:?} to {:?}",
                    id.as_str(),
                    job.status,
                    next
                )));
            }
            job.status = next;
            if next.is_terminal() {
                job.completed_at = Some(clock.now());
            }
            queue.updated_at = clock.now();
            Ok(job.clone())
        })?
    }

    pub fn list_waiting(&self) -> OjResult<Vec<Job>> {
        Ok(self
            .load()?
            .jobs
            .into_iter()
            .filter(|j| j.status == JobStatus::Waiting)
            .collect())
    }

    pub fn all(&self) -> OjResult<Vec<Job>> {
        Ok(self.load()?.jobs)
    }
}

#[cfg(test)]
#[path = "queue_store_tests.rs"]
mod tests;
