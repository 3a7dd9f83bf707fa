//! Extraction engine abstraction
//!
//! The engine performs the actual metadata extraction and file transfer.
//! Platform handlers talk to it only through [`ExtractionEngine`], so the
//! production `yt-dlp` wrapper can be swapped for an in-process fake in
//! tests.

mod ytdlp;

pub use ytdlp::YtDlpEngine;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::handlers::RawFormat;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("unreadable engine output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("engine reported success but {0} is missing")]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-call knobs a handler passes down to the engine
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Netscape cookies file forwarded to the engine
    pub cookies_file: Option<PathBuf>,
}

/// Metadata as reported by the engine, before format normalization
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Read metadata without transferring the media
    async fn probe(&self, url: &str, opts: &EngineOptions) -> Result<RawVideoInfo, EngineError>;

    /// Transfer the media selected by `selector` to `output`
    ///
    /// Returns the path of the written file.
    async fn fetch(
        &self,
        url: &str,
        output: &Path,
        selector: &str,
        opts: &EngineOptions,
    ) -> Result<PathBuf, EngineError>;
}
