use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vidfetch::engine::{EngineError, EngineOptions, ExtractionEngine, RawVideoInfo};
use vidfetch::handlers::RawFormat;

pub const MEDIA_BYTES: &[u8] = b"fake media bytes";

/// Engine that answers from memory and writes a fixed payload
#[derive(Clone, Default)]
pub struct FakeEngine {
    pub probe_error: Option<String>,
    pub delay: Duration,
}

impl FakeEngine {
    pub fn failing(message: &str) -> Self {
        Self {
            probe_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }
}

fn format(id: &str, quality: f64) -> RawFormat {
    RawFormat {
        format_id: Some(id.to_string()),
        ext: Some("mp4".to_string()),
        resolution: Some("1280x720".to_string()),
        quality: Some(quality),
        ..Default::default()
    }
}

#[async_trait]
impl ExtractionEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, _url: &str, _opts: &EngineOptions) -> Result<RawVideoInfo, EngineError> {
        tokio::time::sleep(self.delay).await;
        if let Some(message) = &self.probe_error {
            return Err(EngineError::Failed {
                status: "exit status: 1".to_string(),
                stderr: message.clone(),
            });
        }

        Ok(RawVideoInfo {
            id: Some("dQw4w9WgXcQ".to_string()),
            title: Some("Never Gonna Give You Up".to_string()),
            duration: Some(212.0),
            uploader: Some("Rick Astley".to_string()),
            formats: vec![format("18", 1.0), format("22", 5.0), RawFormat::default()],
            ..Default::default()
        })
    }

    async fn fetch(
        &self,
        _url: &str,
        output: &Path,
        _selector: &str,
        _opts: &EngineOptions,
    ) -> Result<PathBuf, EngineError> {
        tokio::time::sleep(self.delay).await;
        tokio::fs::write(output, MEDIA_BYTES).await?;
        Ok(output.to_path_buf())
    }
}
