// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task folder layout: `tasks/<taskId>/{task,workflow,instance,process}.json`.
//!
//! Task/workflow/instance/process files are mutated by at most one writer
//! per task (the task subprocess); this store itself does no locking, it
//! just makes each write atomic so a crash mid-write never corrupts a file.

use crate::io::StoreIo;
use crate::json_file::{read_json, write_json};
use oj_core::{OjError, OjResult, ProcessInfo, Task, TaskId, TaskStatus, Workflow, WorkflowInstance};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct TaskStore {
    tasks_dir: PathBuf,
    io: Arc<dyn StoreIo>,
}

impl TaskStore {
    pub fn new(tasks_dir: impl Into<PathBuf>, io: Arc<dyn StoreIo>) -> Self {
        Self {
            tasks_dir: tasks_dir.into(),
            io,
        }
    }

    fn task_dir(&self, id: &TaskId) -> PathBuf {
        self.tasks_dir.join(id.as_str())
    }

    fn task_json(&self, id: &TaskId) -> PathBuf {
        self.task_dir(id).join("task.json")
    }

    fn workflow_json(&self, id: &TaskId) -> PathBuf {
        self.task_dir(id).join("workflow.json")
    }

    fn instance_json(&self, id: &TaskId) -> PathBuf {
        self.task_dir(id).join("instance.json")
    }

    fn process_json(&self, id: &TaskId) -> PathBuf {
        self.task_dir(id).join("process.json")
    }

    pub fn get_task(&self, id: &TaskId) -> OjResult<Option<Task>> {
        read_json(&*self.io, &self.task_json(id))
    }

    pub fn save_task(&self, task: &Task) -> OjResult<()> {
        write_json(&*self.io, &self.task_json(&task.id), task)
    }

    pub fn update_task(&self, id: &TaskId, f: impl FnOnce(&mut Task)) -> OjResult<Task> {
        let mut task = self
            .get_task(id)?
            .ok_or_else(|| OjError::NotFound(id.as_str().to_string()))?;
        f(&mut task);
        self.save_task(&task)?;
        Ok(task)
    }

    pub fn delete_task(&self, id: &TaskId) -> OjResult<()> {
        let dir = self.task_dir(id);
        if self.io.exists(&dir) {
            remove_dir_recursive(&dir)?;
        }
        Ok(())
    }

    pub fn get_all_tasks(&self) -> OjResult<Vec<Task>> {
        let mut tasks = Vec::new();
        for name in self.io.list_dir(&self.tasks_dir)? {
            if let Some(task) = self.get_task(&TaskId::new(name))? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    pub fn get_tasks_by_status(&self, status: TaskStatus) -> OjResult<Vec<Task>> {
        Ok(self
            .get_all_tasks()?
            .into_iter()
            .filter(|t| t.status == status)
            .collect())
    }

    /// Resolve a (possibly partial, at least 4 chars) task id to its full
    /// id, failing distinctly when the prefix matches more than one task.
    pub fn resolve_id(&self, prefix: &str) -> OjResult<TaskId> {
        let ids = self.io.list_dir(&self.tasks_dir)?;
        if ids.iter().any(|id| id == prefix) {
            return Ok(TaskId::new(prefix.to_string()));
        }
        if prefix.len() < 4 {
            return Err(OjError::NotFound(prefix.to_string()));
        }
        let matches: Vec<String> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
        match matches.len() {
            0 => Err(OjError::NotFound(prefix.to_string())),
            1 => Ok(TaskId::new(matches.into_iter().next().expect("len checked"))),
            _ => Err(OjError::AmbiguousPrefix {
                prefix: prefix.to_string(),
                matches,
            }),
        }
    }

    pub fn get_workflow(&self, id: &TaskId) -> OjResult<Option<Workflow>> {
        read_json(&*self.io, &self.workflow_json(id))
    }

    pub fn save_workflow(&self, id: &TaskId, workflow: &Workflow) -> OjResult<()> {
        write_json(&*self.io, &self.workflow_json(id), workflow)
    }

    pub fn get_instance(&self, id: &TaskId) -> OjResult<Option<WorkflowInstance>> {
        read_json(&*self.io, &self.instance_json(id))
    }

    pub fn save_instance(&self, id: &TaskId, instance: &WorkflowInstance) -> OjResult<()> {
        write_json(&*self.io, &self.instance_json(id), instance)
    }

    pub fn get_process(&self, id: &TaskId) -> OjResult<Option<ProcessInfo>> {
        read_json(&*self.io, &self.process_json(id))
    }

    pub fn save_process(&self, id: &TaskId, process: &ProcessInfo) -> OjResult<()> {
        write_json(&*self.io, &self.process_json(id), process)
    }
}

fn remove_dir_recursive(dir: &Path) -> OjResult<()> {
    std::fs::remove_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
