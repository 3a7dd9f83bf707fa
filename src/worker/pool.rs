use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::executor::TaskExecutor;
use crate::tasks::TaskId;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shut down, task {0} not dispatched")]
    Closed(TaskId),
}

/// Bounded pool of workers fed round-robin
///
/// Each worker owns a bounded channel; `dispatch` waits when the chosen
/// worker's queue is full. A worker runs one task at a time, each inside
/// its own spawned task so a panic surfaces as a [`JoinError`] instead of
/// taking the worker down.
pub struct WorkerPool {
    worker_channels: Vec<mpsc::Sender<TaskId>>,
    next_worker: AtomicUsize,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(executor: TaskExecutor, num_workers: usize, channel_size: usize) -> Self {
        info!(num_workers, channel_size, "Starting worker pool");

        let mut worker_channels = Vec::with_capacity(num_workers);
        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(channel_size);
            worker_channels.push(tx);
            handles.push(tokio::spawn(worker_loop(worker_id, executor.clone(), rx)));
        }

        Self {
            worker_channels,
            next_worker: AtomicUsize::new(0),
            handles,
        }
    }

    /// Queue a task for execution on the next worker
    pub async fn dispatch(&self, task_id: TaskId) -> Result<(), PoolError> {
        let worker_idx =
            self.next_worker.fetch_add(1, Ordering::Relaxed) % self.worker_channels.len();

        self.worker_channels[worker_idx]
            .send(task_id)
            .await
            .map_err(|e| {
                warn!(task_id = %e.0, worker_idx, "Worker channel closed");
                PoolError::Closed(e.0)
            })?;

        debug!(worker_idx, "Task sent to worker");
        Ok(())
    }

    pub fn num_workers(&self) -> usize {
        self.worker_channels.len()
    }

    /// Abort every worker; later dispatches fail with [`PoolError::Closed`]
    pub fn stop(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }

    /// True while every worker is still receiving
    pub fn health_check(&self) -> bool {
        self.worker_channels.iter().all(|ch| !ch.is_closed())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn worker_loop(worker_id: usize, executor: TaskExecutor, mut rx: mpsc::Receiver<TaskId>) {
    debug!(worker_id, "Worker started");

    while let Some(task_id) = rx.recv().await {
        let run = executor.clone();
        let id = task_id.clone();
        let outcome = tokio::spawn(async move { run.run(&id).await }).await;

        if let Err(e) = outcome {
            executor.recover(&task_id, crash_message(e)).await;
        }
    }

    debug!(worker_id, "Worker stopped");
}

fn crash_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "execution aborted".to_string();
    }

    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    format!("internal error: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::testing::ScriptedEngine;
    use crate::handlers::HandlerRegistry;
    use crate::observability::Metrics;
    use crate::tasks::{TaskStatus, TaskStore};
    use crate::urls::Platform;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn pool(engine: ScriptedEngine, store: &TaskStore, dir: &TempDir, workers: usize) -> WorkerPool {
        let registry =
            HandlerRegistry::with_defaults(Arc::new(engine), &EngineConfig::default()).unwrap();
        let executor = TaskExecutor::new(
            store.clone(),
            Arc::new(registry),
            dir.path().to_path_buf(),
            Arc::new(Metrics::new()),
        );
        WorkerPool::start(executor, workers, 8)
    }

    async fn wait_terminal(store: &TaskStore, id: &str) -> TaskStatus {
        for _ in 0..200 {
            let status = store.get(id).await.unwrap().status;
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {id} never finished");
    }

    #[tokio::test]
    async fn test_pool_runs_tasks() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new();
        let pool = pool(ScriptedEngine::succeeding("Clip"), &store, &dir, 3);
        assert_eq!(pool.num_workers(), 3);
        assert!(pool.health_check());

        let mut ids = Vec::new();
        for i in 0..6 {
            let id = store
                .create(format!("https://vimeo.com/{i}"), Platform::Vimeo, None)
                .await;
            pool.dispatch(id.clone()).await.unwrap();
            ids.push(id);
        }

        for id in &ids {
            assert_eq!(wait_terminal(&store, id).await, TaskStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_failed() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new();
        let pool = pool(ScriptedEngine::succeeding("x").panicking(), &store, &dir, 1);

        let id = store
            .create("https://vimeo.com/1".to_string(), Platform::Vimeo, None)
            .await;
        pool.dispatch(id.clone()).await.unwrap();

        assert_eq!(wait_terminal(&store, &id).await, TaskStatus::Failed);
        let task = store.get(&id).await.unwrap();
        assert!(task.error.unwrap().contains("engine blew up"));

        // worker survives the panic
        let next = store
            .create("https://vimeo.com/2".to_string(), Platform::Vimeo, None)
            .await;
        pool.dispatch(next.clone()).await.unwrap();
        assert_eq!(wait_terminal(&store, &next).await, TaskStatus::Failed);
    }
}
