//! Download manager
//!
//! Facade over the URL classifier, handler registry, task store and worker
//! pool. The HTTP layer talks only to this type.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::ExtractionEngine;
use crate::handlers::{FormatDescriptor, HandlerError, HandlerRegistry, RegistryError, VideoInfo};
use crate::observability::Metrics;
use crate::tasks::{StoreError, Task, TaskId, TaskStatus, TaskStore};
use crate::urls::{self, Platform, UrlError};
use crate::worker::{PoolError, TaskExecutor, WorkerPool};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("task {id} is {status}, not completed")]
    NotReady { id: TaskId, status: TaskStatus },

    #[error("result file for task {0} is missing")]
    FileMissing(TaskId),
}

pub type Result<T> = std::result::Result<T, ManagerError>;

pub struct DownloadManager {
    store: TaskStore,
    registry: Arc<HandlerRegistry>,
    pool: WorkerPool,
    metrics: Arc<Metrics>,
}

impl DownloadManager {
    /// Start the worker pool and wire everything together
    pub fn new(
        store: TaskStore,
        registry: Arc<HandlerRegistry>,
        config: &Config,
        metrics: Arc<Metrics>,
    ) -> Self {
        let executor = TaskExecutor::new(
            store.clone(),
            registry.clone(),
            config.server.download_dir.clone(),
            metrics.clone(),
        );
        let pool = WorkerPool::start(
            executor,
            config.workers.pool_size,
            config.workers.queue_capacity,
        );

        Self {
            store,
            registry,
            pool,
            metrics,
        }
    }

    /// Build with the default handler set on top of `engine`
    pub fn from_config(
        config: &Config,
        engine: Arc<dyn ExtractionEngine>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        info!(engine = engine.name(), "Initializing download manager");
        let registry = HandlerRegistry::with_defaults(engine, &config.engine)?;
        Ok(Self::new(TaskStore::new(), Arc::new(registry), config, metrics))
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Validate, classify and normalize a submitted URL
    fn prepare(url: &str) -> Result<(String, Platform)> {
        let url = url.trim();
        urls::parse(url)?;
        let (platform, content_id) = urls::classify(url);
        debug!(url, platform = %platform, ?content_id, "URL classified");
        Ok((urls::normalize(url, platform), platform))
    }

    /// Create a task and queue it for execution
    pub async fn submit(&self, url: &str, format_id: Option<String>) -> Result<TaskId> {
        let (url, platform) = Self::prepare(url)?;
        let format_id = format_id
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        let id = self.store.create(url, platform, format_id).await;
        self.metrics.task_submitted();
        info!(task_id = %id, platform = %platform, "Download submitted");

        if let Err(e) = self.pool.dispatch(id.clone()).await {
            if self.store.cancel(&id).await {
                self.metrics.task_cancelled();
            }
            return Err(e.into());
        }

        Ok(id)
    }

    /// Read metadata for a URL without creating a task
    pub async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
        let (url, platform) = Self::prepare(url)?;
        let handler = self.registry.resolve(platform)?;
        Ok(handler.extract_info(&url).await?)
    }

    pub async fn list_formats(&self, url: &str) -> Result<Vec<FormatDescriptor>> {
        let (url, platform) = Self::prepare(url)?;
        let handler = self.registry.resolve(platform)?;
        Ok(handler.list_formats(&url).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list(&self) -> Vec<Task> {
        self.store.list().await
    }

    pub async fn cancel(&self, id: &str) -> Result<Task> {
        let task = self.store.try_cancel(id).await?;
        self.metrics.task_cancelled();
        Ok(task)
    }

    /// Path of a completed task's file, checked to exist on disk
    pub async fn result_file(&self, id: &str) -> Result<(Task, PathBuf)> {
        let task = self.store.get(id).await?;
        if task.status != TaskStatus::Completed {
            return Err(ManagerError::NotReady {
                id: task.id,
                status: task.status,
            });
        }

        let path = match &task.file_path {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => path.clone(),
            _ => return Err(ManagerError::FileMissing(task.id)),
        };

        Ok((task, path))
    }

    pub async fn sweep(&self, max_age: Duration) -> usize {
        let removed = self.store.sweep(max_age).await;
        if removed > 0 {
            self.metrics.tasks_swept(removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedEngine;
    use tempfile::TempDir;

    fn manager(engine: ScriptedEngine, dir: &TempDir) -> DownloadManager {
        let mut config = Config::default();
        config.server.download_dir = dir.path().to_path_buf();
        config.workers.pool_size = 2;
        DownloadManager::from_config(&config, Arc::new(engine), Arc::new(Metrics::new())).unwrap()
    }

    async fn wait_terminal(manager: &DownloadManager, id: &str) -> Task {
        for _ in 0..200 {
            let task = manager.get(id).await.unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {id} never finished");
    }

    #[tokio::test]
    async fn test_submit_normalizes_and_completes() {
        let dir = TempDir::new().unwrap();
        let manager = manager(ScriptedEngine::succeeding("Clip"), &dir);

        let id = manager
            .submit("https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap();
        let task = wait_terminal(&manager, &id).await;

        assert_eq!(task.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(task.platform, Platform::YouTube);
        assert_eq!(task.status, TaskStatus::Completed);

        let (_, path) = manager.result_file(&id).await.unwrap();
        assert!(path.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_invalid_url_creates_no_task() {
        let dir = TempDir::new().unwrap();
        let manager = manager(ScriptedEngine::succeeding("Clip"), &dir);

        for url in ["not a url", "ftp://example.com/file", "https://nodot/x"] {
            assert!(matches!(
                manager.submit(url, None).await,
                Err(ManagerError::InvalidUrl(_))
            ));
        }
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_format_is_ignored() {
        let dir = TempDir::new().unwrap();
        let manager = manager(ScriptedEngine::succeeding("Clip"), &dir);

        let id = manager
            .submit("https://vimeo.com/123", Some("  ".to_string()))
            .await
            .unwrap();
        assert!(manager.get(&id).await.unwrap().requested_format.is_none());
    }

    #[tokio::test]
    async fn test_format_is_trimmed_before_engine() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(ScriptedEngine::succeeding("Clip"));
        let mut config = Config::default();
        config.server.download_dir = dir.path().to_path_buf();
        let manager =
            DownloadManager::from_config(&config, engine.clone(), Arc::new(Metrics::new())).unwrap();

        let id = manager
            .submit("https://vimeo.com/123", Some(" 22 ".to_string()))
            .await
            .unwrap();
        let task = wait_terminal(&manager, &id).await;

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.requested_format.as_deref(), Some("22"));
        assert_eq!(*engine.selectors.lock().unwrap(), vec!["22".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_cancels_and_counts() {
        let dir = TempDir::new().unwrap();
        let metrics = Arc::new(Metrics::new());
        let mut config = Config::default();
        config.server.download_dir = dir.path().to_path_buf();
        let manager = DownloadManager::from_config(
            &config,
            Arc::new(ScriptedEngine::succeeding("Clip")),
            metrics.clone(),
        )
        .unwrap();

        manager.pool().stop();
        for _ in 0..200 {
            if !manager.pool().health_check() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let err = manager.submit("https://vimeo.com/123", None).await.unwrap_err();
        assert!(matches!(err, ManagerError::Pool(_)));

        let tasks = manager.list().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Cancelled);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 1);
        assert_eq!(snapshot.tasks_cancelled, 1);
    }

    #[tokio::test]
    async fn test_result_file_requires_completion() {
        let dir = TempDir::new().unwrap();
        let manager = manager(
            ScriptedEngine::succeeding("Clip").with_delay(Duration::from_secs(30)),
            &dir,
        );

        let id = manager.submit("https://vimeo.com/123", None).await.unwrap();
        assert!(matches!(
            manager.result_file(&id).await,
            Err(ManagerError::NotReady { .. })
        ));

        let task = manager.cancel(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(matches!(
            manager.cancel(&id).await,
            Err(ManagerError::Store(StoreError::InvalidTransition { .. }))
        ));
        assert!(matches!(
            manager.result_file("missing").await,
            Err(ManagerError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_extract_info_and_formats() {
        let dir = TempDir::new().unwrap();
        let manager = manager(ScriptedEngine::succeeding("Clip"), &dir);

        let info = manager
            .extract_info("https://www.tiktok.com/@user/video/7234567890123456789")
            .await
            .unwrap();
        assert_eq!(info.platform, Platform::TikTok);
        assert!(manager.list().await.is_empty());

        let formats = manager.list_formats("https://vimeo.com/1").await.unwrap();
        assert!(formats.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_counts_metric() {
        let dir = TempDir::new().unwrap();
        let manager = manager(ScriptedEngine::succeeding("x").failing_probe("gone"), &dir);

        let id = manager.submit("https://vimeo.com/1", None).await.unwrap();
        wait_terminal(&manager, &id).await;

        assert_eq!(manager.sweep(Duration::ZERO).await, 1);
        assert!(manager.get(&id).await.is_err());
        assert_eq!(manager.metrics.snapshot().tasks_swept, 1);
    }
}
