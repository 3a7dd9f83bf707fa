use chrono::{TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::model::{Task, TaskId, TaskStatus};
use crate::urls::Platform;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

struct Entry {
    task: Task,
    /// Set once an executor has taken the task
    dispatched: bool,
    cancel: CancellationToken,
}

impl Entry {
    fn check(&self, to: TaskStatus) -> Result<()> {
        if self.task.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(self.invalid(to))
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.task.status.is_terminal() {
            Err(self.invalid(self.task.status))
        } else {
            Ok(())
        }
    }

    fn invalid(&self, to: TaskStatus) -> StoreError {
        StoreError::InvalidTransition {
            id: self.task.id.clone(),
            from: self.task.status,
            to,
        }
    }
}

/// In-memory task table
///
/// All mutation goes through this type and happens under one lock, so
/// readers only ever see whole records. Callers receive cloned snapshots.
#[derive(Clone, Default)]
pub struct TaskStore {
    entries: Arc<Mutex<HashMap<TaskId, Entry>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(
        &self,
        url: String,
        platform: Platform,
        requested_format: Option<String>,
    ) -> TaskId {
        let task = Task::new(url, platform, requested_format);
        let id = task.id.clone();

        debug!(task_id = %id, platform = %platform, "Task created");

        self.entries.lock().await.insert(
            id.clone(),
            Entry {
                task,
                dispatched: false,
                cancel: CancellationToken::new(),
            },
        );

        id
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        self.entries
            .lock()
            .await
            .get(id)
            .map(|e| e.task.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Snapshot of every task, oldest first
    pub async fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .entries
            .lock()
            .await
            .values()
            .map(|e| e.task.clone())
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    pub async fn counts_by_status(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.lock().await.values() {
            *counts.entry(entry.task.status.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Cancel a non-terminal task and signal its executor
    pub async fn try_cancel(&self, id: &str) -> Result<Task> {
        self.update(id, |entry| {
            entry.check(TaskStatus::Cancelled)?;
            entry.task.status = TaskStatus::Cancelled;
            entry.task.completed_at = Some(Utc::now());
            entry.cancel.cancel();
            Ok(entry.task.clone())
        })
        .await
        .inspect(|task| info!(task_id = %task.id, "Task cancelled"))
    }

    pub async fn cancel(&self, id: &str) -> bool {
        self.try_cancel(id).await.is_ok()
    }

    /// Remove terminal tasks that finished at least `max_age` ago
    pub async fn sweep(&self, max_age: Duration) -> usize {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let now = Utc::now();

        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            let expired = entry.task.status.is_terminal()
                && entry
                    .task
                    .completed_at
                    .is_some_and(|done| now.signed_duration_since(done) >= max_age);
            !expired
        });
        let removed = before - entries.len();

        if removed > 0 {
            info!(removed, remaining = entries.len(), "Swept finished tasks");
        }
        removed
    }

    /// Mark a task as taken by an executor
    ///
    /// Returns `None` when the task is unknown, already claimed, or no
    /// longer in `Created`.
    pub async fn claim(&self, id: &str) -> Option<CancellationToken> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(id)?;
        if entry.dispatched || entry.task.status != TaskStatus::Created {
            return None;
        }
        entry.dispatched = true;
        Some(entry.cancel.clone())
    }

    /// Move to a non-terminal phase
    pub async fn transition(&self, id: &str, to: TaskStatus) -> Result<Task> {
        self.update(id, |entry| {
            if to.is_terminal() {
                return Err(entry.invalid(to));
            }
            entry.check(to)?;
            entry.task.status = to;
            if to == TaskStatus::Starting {
                entry.task.started_at = Some(Utc::now());
            }
            Ok(entry.task.clone())
        })
        .await
    }

    /// Raise progress; lower values are ignored
    pub async fn set_progress(&self, id: &str, progress: u8) -> Result<()> {
        self.update(id, |entry| {
            entry.check_open()?;
            entry.task.progress = entry.task.progress.max(progress.min(100));
            Ok(())
        })
        .await
    }

    pub async fn record_metadata(
        &self,
        id: &str,
        title: Option<String>,
        thumbnail: Option<String>,
    ) -> Result<()> {
        self.update(id, |entry| {
            entry.check_open()?;
            entry.task.title = title;
            entry.task.thumbnail = thumbnail;
            Ok(())
        })
        .await
    }

    pub async fn complete(&self, id: &str, file_path: PathBuf) -> Result<Task> {
        self.update(id, |entry| {
            entry.check(TaskStatus::Completed)?;
            entry.task.status = TaskStatus::Completed;
            entry.task.progress = 100;
            entry.task.file_path = Some(file_path);
            entry.task.completed_at = Some(Utc::now());
            Ok(entry.task.clone())
        })
        .await
    }

    pub async fn fail(&self, id: &str, message: String) -> Result<Task> {
        self.update(id, |entry| {
            entry.check(TaskStatus::Failed)?;
            entry.task.status = TaskStatus::Failed;
            entry.task.error = Some(message);
            entry.task.completed_at = Some(Utc::now());
            Ok(entry.task.clone())
        })
        .await
    }

    async fn update<T>(&self, id: &str, f: impl FnOnce(&mut Entry) -> Result<T>) -> Result<T> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(entry)
    }
}
