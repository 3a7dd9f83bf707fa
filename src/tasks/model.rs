use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::urls::Platform;

pub type TaskId = String;

/// Task lifecycle state
///
/// ```text
/// Created -> Starting -> Extracting -> Downloading -> Completed
///               |            |             |
///               +------------+-------------+-> Failed
/// Created/Starting/Extracting/Downloading -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Created,
    Starting,
    Extracting,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;

        match (self, next) {
            (Created, Starting)
            | (Starting, Extracting)
            | (Extracting, Downloading)
            | (Downloading, Completed) => true,
            (Starting | Extracting | Downloading, Failed) => true,
            (Created | Starting | Extracting | Downloading, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Extracting => "extracting",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a download task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    pub platform: Platform,
    pub requested_format: Option<String>,
    pub status: TaskStatus,
    /// Percent complete, 0-100
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub file_path: Option<PathBuf>,
    pub error: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

impl Task {
    pub fn new(url: String, platform: Platform, requested_format: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            platform,
            requested_format,
            status: TaskStatus::Created,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            file_path: None,
            error: None,
            title: None,
            thumbnail: None,
        }
    }
}
