use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::formats::FormatDescriptor;
use super::types::{DownloadResult, VideoInfo};
use crate::urls::Platform;

/// Handler errors
///
/// Every capability reports failure through this type; handlers never
/// panic or raise outside it.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("download failed: {0}")]
    Download(String),
}

/// Capability set implemented once per platform
#[async_trait]
pub trait PlatformHandler: Send + Sync {
    fn platform(&self) -> Platform;

    /// Read title, duration, thumbnail, uploader and formats without
    /// transferring the media
    async fn extract_info(&self, url: &str) -> Result<VideoInfo, HandlerError>;

    /// Same list as `extract_info(url).formats`
    async fn list_formats(&self, url: &str) -> Result<Vec<FormatDescriptor>, HandlerError> {
        Ok(self.extract_info(url).await?.formats)
    }

    /// Transfer the media to `output_path`, creating parent directories
    ///
    /// Without `format_id` the handler applies its own "best" policy.
    async fn download(
        &self,
        url: &str,
        output_path: &Path,
        format_id: Option<&str>,
    ) -> Result<DownloadResult, HandlerError>;
}
