//! Drives a single task through its phases

use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::handlers::{HandlerError, HandlerRegistry};
use crate::humanize::ByteSize;
use crate::observability::Metrics;
use crate::tasks::{StoreError, TaskStatus, TaskStore};

const MAX_STEM_CHARS: usize = 50;

/// Progress reported at each phase boundary
mod progress {
    pub const STARTED: u8 = 10;
    pub const EXTRACTED: u8 = 25;
    pub const TRANSFERRING: u8 = 30;
}

/// Why a run ended early
#[derive(Debug)]
enum Halt {
    Cancelled,
    Failed(String),
}

impl From<StoreError> for Halt {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTransition {
                from: TaskStatus::Cancelled,
                ..
            } => Halt::Cancelled,
            other => Halt::Failed(other.to_string()),
        }
    }
}

impl From<HandlerError> for Halt {
    fn from(err: HandlerError) -> Self {
        Halt::Failed(err.to_string())
    }
}

#[derive(Clone)]
pub struct TaskExecutor {
    store: TaskStore,
    registry: Arc<HandlerRegistry>,
    download_dir: PathBuf,
    metrics: Arc<Metrics>,
}

impl TaskExecutor {
    pub fn new(
        store: TaskStore,
        registry: Arc<HandlerRegistry>,
        download_dir: PathBuf,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            registry,
            download_dir,
            metrics,
        }
    }

    /// Run the task to a terminal state
    ///
    /// No-op when the task does not exist or another executor already
    /// claimed it.
    pub async fn run(&self, task_id: &str) {
        let Some(token) = self.store.claim(task_id).await else {
            debug!(task_id, "Task missing or already dispatched, skipping");
            return;
        };

        match self.drive(task_id, &token).await {
            Ok(path) => {
                self.metrics.task_completed();
                let size = tokio::fs::metadata(&path)
                    .await
                    .map(|m| ByteSize(m.len()))
                    .unwrap_or_default();
                info!(task_id, path = %path.display(), %size, "Task completed");
            }
            Err(Halt::Cancelled) => {
                debug!(task_id, "Task cancelled, executor stopped");
            }
            Err(Halt::Failed(message)) => self.fail(task_id, message).await,
        }
    }

    /// Mark a task failed after its execution context died unexpectedly
    pub async fn recover(&self, task_id: &str, message: String) {
        error!(task_id, %message, "Executor crashed");
        self.fail(task_id, message).await;
    }

    async fn fail(&self, task_id: &str, message: String) {
        match self.store.fail(task_id, message.clone()).await {
            Ok(_) => {
                self.metrics.task_failed();
                warn!(task_id, error = %message, "Task failed");
            }
            Err(e) => debug!(task_id, error = %e, "Could not record failure"),
        }
    }

    async fn drive(&self, id: &str, token: &CancellationToken) -> Result<PathBuf, Halt> {
        let task = self.store.transition(id, TaskStatus::Starting).await?;
        self.store.set_progress(id, progress::STARTED).await?;

        let handler = self
            .registry
            .resolve(task.platform)
            .map_err(|e| Halt::Failed(e.to_string()))?;

        self.store.transition(id, TaskStatus::Extracting).await?;
        debug!(task_id = id, platform = %task.platform, "Extracting");
        let info = until_cancelled(token, handler.extract_info(&task.url)).await?;
        self.store.set_progress(id, progress::EXTRACTED).await?;

        let output = self.download_dir.join(output_file_name(&info.title));
        self.store
            .record_metadata(id, Some(info.title), info.thumbnail)
            .await?;

        self.store.transition(id, TaskStatus::Downloading).await?;
        self.store.set_progress(id, progress::TRANSFERRING).await?;
        debug!(task_id = id, output = %output.display(), "Downloading");

        let result = until_cancelled(
            token,
            handler.download(&task.url, &output, task.requested_format.as_deref()),
        )
        .await?;

        self.store.complete(id, result.file_path.clone()).await?;
        Ok(result.file_path)
    }
}

/// Race a handler call against the task's cancellation token
///
/// The losing future is dropped, which kills any engine child process.
async fn until_cancelled<T>(
    token: &CancellationToken,
    call: impl Future<Output = Result<T, HandlerError>>,
) -> Result<T, Halt> {
    tokio::select! {
        _ = token.cancelled() => Err(Halt::Cancelled),
        result = call => result.map_err(Halt::from),
    }
}

/// File name for a download derived from the media title
///
/// Keeps alphanumerics, spaces, `.`, `_` and `-`, caps the stem at 50
/// characters, and appends a timestamp plus a short random suffix.
pub fn output_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect();
    let stem: String = cleaned.trim().chars().take(MAX_STEM_CHARS).collect();
    let stem = match stem.trim_end() {
        "" => "video",
        s => s,
    };

    let suffix = Uuid::new_v4().simple().to_string();
    format!("{stem}_{}_{}.mp4", Utc::now().timestamp(), &suffix[..8])
}
