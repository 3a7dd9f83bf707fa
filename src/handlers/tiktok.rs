use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::common::EngineProfile;
use super::traits::{HandlerError, PlatformHandler};
use super::types::{DownloadResult, VideoInfo};
use crate::engine::{EngineOptions, ExtractionEngine};
use crate::urls::Platform;

/// TikTok handler; TikTok serves muxed streams so `best` is enough
#[derive(Clone)]
pub struct TikTokHandler {
    profile: EngineProfile,
}

impl TikTokHandler {
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self {
            profile: EngineProfile {
                engine,
                options: EngineOptions::default(),
                platform: Platform::TikTok,
                best_selector: "best",
                default_title: "TikTok Video",
            },
        }
    }
}

#[async_trait]
impl PlatformHandler for TikTokHandler {
    fn platform(&self) -> Platform {
        Platform::TikTok
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
