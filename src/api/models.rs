//! Request and response bodies for the HTTP API
//!
//! Every JSON response carries a `success` flag. Failures use
//! [`ErrorResponse`] with a stable machine-readable `code`.
//!
//! ```json
//! POST /api/download
//! { "url": "https://youtu.be/dQw4w9WgXcQ", "format_id": "22" }
//!
//! 200 OK
//! { "success": true, "task_id": "1b4e28ba-...", "message": "Download started" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::handlers::{FormatDescriptor, VideoInfo};
use crate::observability::MetricsSnapshot;
use crate::tasks::{Task, TaskId};
use crate::urls::Platform;

/// Body of `/api/extract` and `/api/formats`
#[derive(Debug, Clone, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

/// Body of `POST /api/download`
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub format_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    #[serde(flatten)]
    pub info: VideoInfo,
}

#[derive(Debug, Serialize)]
pub struct DownloadStartedResponse {
    pub success: bool,
    pub task_id: TaskId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub success: bool,
    pub formats: Vec<FormatDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    /// Platforms with a dedicated handler
    pub platforms: Vec<Platform>,
    pub tasks: BTreeMap<&'static str, usize>,
    pub metrics: MetricsSnapshot,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: &'static str,
    pub error: String,
}
