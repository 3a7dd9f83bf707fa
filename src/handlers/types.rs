use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::formats::{FormatDescriptor, process_formats};
use crate::engine::RawVideoInfo;
use crate::urls::Platform;

/// Metadata returned by `extract_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub formats: Vec<FormatDescriptor>,
    pub platform: Platform,
    pub url: String,
}

impl VideoInfo {
    /// Shape engine metadata into the canonical form
    pub fn from_raw(raw: RawVideoInfo, platform: Platform, url: &str, default_title: &str) -> Self {
        Self {
            id: raw.id,
            title: raw
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| default_title.to_string()),
            description: raw.description,
            thumbnail: raw.thumbnail,
            duration: raw.duration,
            uploader: raw.uploader,
            view_count: raw.view_count,
            formats: process_formats(raw.formats),
            platform,
            url: url.to_string(),
        }
    }
}

/// Outcome of a successful `download`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    pub file_path: PathBuf,
    pub title: Option<String>,
    /// Format actually requested from the engine (`"best"` when unspecified)
    pub format: String,
    pub platform: Platform,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::RawFormat;

    #[test]
    fn test_from_raw_defaults_title_and_sorts_formats() {
        let raw = RawVideoInfo {
            title: Some("   ".to_string()),
            formats: vec![
                RawFormat {
                    format_id: Some("low".to_string()),
                    quality: Some(1.0),
                    ..Default::default()
                },
                RawFormat {
                    format_id: Some("high".to_string()),
                    quality: Some(9.0),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let info = VideoInfo::from_raw(raw, Platform::TikTok, "https://vm.tiktok.com/x", "TikTok Video");
        assert_eq!(info.title, "TikTok Video");
        assert_eq!(info.platform, Platform::TikTok);
        assert_eq!(info.formats[0].format_id, "high");
    }
}
