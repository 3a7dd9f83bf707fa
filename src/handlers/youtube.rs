use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::common::EngineProfile;
use super::traits::{HandlerError, PlatformHandler};
use super::types::{DownloadResult, VideoInfo};
use crate::engine::{EngineOptions, ExtractionEngine};
use crate::urls::Platform;

/// YouTube handler
///
/// Merges the best video and audio streams by default and forwards an
/// optional cookies file so age-gated videos can be read.
#[derive(Clone)]
pub struct YouTubeHandler {
    profile: EngineProfile,
}

impl YouTubeHandler {
    pub fn new(engine: Arc<dyn ExtractionEngine>, cookies_file: Option<PathBuf>) -> Self {
        Self {
            profile: EngineProfile {
                engine,
                options: EngineOptions { cookies_file },
                platform: Platform::YouTube,
                best_selector: "bestvideo+bestaudio/best",
                default_title: "video",
            },
        }
    }
}

#[async_trait]
impl PlatformHandler for YouTubeHandler {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn extract_info(&self, url: &str) -> Result<VideoInfo, HandlerError> {
        self.profile.extract(url).await
    }

    async fn download(
        &self,
        url: &str,
        output_path: &Path,
        format_id: Option<&str>,
    ) -> Result<DownloadResult, HandlerError> {
        self.profile.download(url, output_path, format_id).await
    }
}
