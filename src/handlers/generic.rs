use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::common::EngineProfile;
use super::traits::{HandlerError, PlatformHandler};
use super::types::{DownloadResult, VideoInfo};
use crate::engine::{EngineOptions, ExtractionEngine};
use crate::urls::Platform;

/// Fallback handler for platforms without a dedicated implementation
///
/// Passes the URL straight to the engine and lets it pick the extractor.
#[derive(Clone)]
pub struct GenericHandler {
    profile: EngineProfile,
}

impl GenericHandler {
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self {
            profile: EngineProfile {
                engine,
                options: EngineOptions::default(),
                platform: Platform::Generic,
                best_selector: "best",
                default_title: "video",
            },
        }
    }
}

#[async_trait]
impl PlatformHandler for GenericHandler {
    fn platform(&self) -> Platform {
        Platform::Generic
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedEngine;

    #[tokio::test]
    async fn test_generic_reports_generic_platform() {
        let handler = GenericHandler::new(Arc::new(ScriptedEngine::succeeding("Clip")));
        let info = handler.extract_info("https://vimeo.com/123456").await.unwrap();
        assert_eq!(info.platform, Platform::Generic);
        assert_eq!(info.title, "Clip");
    }
}
