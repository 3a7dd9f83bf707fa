use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::HandlerError;
use super::types::{DownloadResult, VideoInfo};
use crate::engine::{EngineOptions, ExtractionEngine};
use crate::urls::Platform;

/// Engine access plus the per-platform defaults every handler needs
#[derive(Clone)]
pub(crate) struct EngineProfile {
    pub engine: Arc<dyn ExtractionEngine>,
    pub options: EngineOptions,
    pub platform: Platform,
    /// Selector used when the caller does not pick a format
    pub best_selector: &'static str,
    pub default_title: &'static str,
}

impl EngineProfile {
    pub async fn extract(&self, url: &str) -> Result<VideoInfo, HandlerError> {
        debug!(platform = %self.platform, url, "Extracting info");

        let raw = self
            .engine
            .probe(url, &self.options)
            .await
            .map_err(|e| HandlerError::Extraction(e.to_string()))?;

        Ok(VideoInfo::from_raw(raw, self.platform, url, self.default_title))
    }

    pub async fn download(
        &self,
        url: &str,
        output_path: &Path,
        format_id: Option<&str>,
    ) -> Result<DownloadResult, HandlerError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HandlerError::Download(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let selector = format_id.unwrap_or(self.best_selector);
        let file_path = self
            .engine
            .fetch(url, output_path, selector, &self.options)
            .await
            .map_err(|e| HandlerError::Download(e.to_string()))?;

        info!(platform = %self.platform, path = %file_path.display(), selector, "Download finished");

        Ok(DownloadResult {
            file_path,
            title: None,
            format: format_id.unwrap_or("best").to_string(),
            platform: self.platform,
        })
    }
}
