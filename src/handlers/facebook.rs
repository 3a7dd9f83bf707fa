use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::common::EngineProfile;
use super::traits::{HandlerError, PlatformHandler};
use super::types::{DownloadResult, VideoInfo};
use crate::engine::{EngineOptions, ExtractionEngine};
use crate::urls::{self, Platform};

const DEFAULT_TITLE: &str = "Facebook Video";
const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

static OG_TITLE: LazyLock<Regex> = LazyLock::new(|| meta_regex("og:title"));
static OG_IMAGE: LazyLock<Regex> = LazyLock::new(|| meta_regex("og:image"));
static TITLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern is valid")
});

fn meta_regex(property: &str) -> Regex {
    Regex::new(&format!(
        r#"(?is)<meta[^>]+property=["']{}["'][^>]+content=["']([^"']*)["']"#,
        regex::escape(property)
    ))
    .expect("meta pattern is valid")
}

/// Facebook handler
///
/// Facebook often hides metadata from the engine for public videos. When
/// the engine probe fails, the handler reads the Open Graph tags of the
/// page itself and returns what it finds with an empty format list.
#[derive(Clone)]
pub struct FacebookHandler {
    profile: EngineProfile,
    client: Client,
}

impl FacebookHandler {
    pub fn new(engine: Arc<dyn ExtractionEngine>, user_agent: &str) -> Result<Self, HandlerError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(PAGE_TIMEOUT)
            .build()
            .map_err(|e| HandlerError::Extraction(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            profile: EngineProfile {
                engine,
                options: EngineOptions::default(),
                platform: Platform::Facebook,
                best_selector: "bestvideo+bestaudio/best",
                default_title: DEFAULT_TITLE,
            },
            client,
        })
    }

    async fn scrape_page(&self, url: &str) -> Result<VideoInfo, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let html = response.text().await.map_err(|e| e.to_string())?;

        Ok(parse_page(&html, url))
    }
}

/// Build metadata from a raw HTML page
fn parse_page(html: &str, url: &str) -> VideoInfo {
    let capture = |re: &Regex| {
        re.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str().trim()))
            .filter(|s| !s.is_empty())
    };

    let title = capture(&OG_TITLE)
        .or_else(|| capture(&TITLE_TAG))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    VideoInfo {
        id: urls::classify(url).1,
        title,
        description: Some("No description available".to_string()),
        thumbnail: capture(&OG_IMAGE),
        duration: None,
        uploader: None,
        view_count: None,
        formats: Vec::new(),
        platform: Platform::Facebook,
        url: url.to_string(),
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[async_trait]
impl PlatformHandler for FacebookHandler {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn extract_info(&self, url: &str) -> Result<VideoInfo, HandlerError> {
        let primary = match self.profile.extract(url).await {
            Ok(info) => return Ok(info),
            Err(e) => e,
        };

        warn!(url, error = %primary, "Engine extraction failed, reading page metadata");

        match self.scrape_page(url).await {
            Ok(info) => {
                debug!(url, title = %info.title, "Page metadata fallback succeeded");
                Ok(info)
            }
            Err(fallback) => Err(HandlerError::Extraction(format!(
                "primary extraction failed: {primary}; page fallback failed: {fallback}"
            ))),
        }
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
    use axum::{Router, response::Html, routing::get};
    use tokio::net::TcpListener;

    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    async fn serve(html: &'static str) -> String {
        let app = Router::new().route("/watch/", get(move || async move { Html(html) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/watch/?v=1234567890")
    }

    #[test]
    fn test_parse_page_prefers_open_graph() {
        let html = r#"<html><head>
            <title>Facebook</title>
            <meta property="og:title" content="Cats &amp; Dogs" />
            <meta property="og:image" content="https://scontent.example.com/t.jpg" />
        </head></html>"#;

        let info = parse_page(html, "https://www.facebook.com/watch/?v=1234567890");
        assert_eq!(info.title, "Cats & Dogs");
        assert_eq!(info.thumbnail.as_deref(), Some("https://scontent.example.com/t.jpg"));
        assert_eq!(info.id.as_deref(), Some("1234567890"));
        assert!(info.formats.is_empty());
    }

    #[test]
    fn test_parse_page_defaults() {
        let info = parse_page("<html></html>", "https://fb.watch/abc/");
        assert_eq!(info.title, "Facebook Video");
        assert!(info.thumbnail.is_none());
        assert_eq!(info.description.as_deref(), Some("No description available"));

        let info = parse_page("<title> Some clip </title>", "https://fb.watch/abc/");
        assert_eq!(info.title, "Some clip");
    }

    #[tokio::test]
    async fn test_engine_success_skips_fallback() {
        let handler =
            FacebookHandler::new(Arc::new(ScriptedEngine::succeeding("Reel")), UA).unwrap();
        let info = handler
            .extract_info("http://127.0.0.1:9/unreachable")
            .await
            .unwrap();
        assert_eq!(info.title, "Reel");
    }

    #[tokio::test]
    async fn test_fallback_reads_page() {
        let url = serve(r#"<meta property="og:title" content="Fallback clip">"#).await;
        let engine = ScriptedEngine::succeeding("x").failing_probe("Cannot parse data");
        let handler = FacebookHandler::new(Arc::new(engine), UA).unwrap();

        let info = handler.extract_info(&url).await.unwrap();
        assert_eq!(info.title, "Fallback clip");
        assert_eq!(info.platform, Platform::Facebook);
        assert!(info.formats.is_empty());
    }

    #[tokio::test]
    async fn test_both_failures_are_reported() {
        let engine = ScriptedEngine::succeeding("x").failing_probe("Cannot parse data");
        let handler = FacebookHandler::new(Arc::new(engine), UA).unwrap();

        let err = handler
            .extract_info("http://127.0.0.1:9/watch/?v=1")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Cannot parse data"));
        assert!(message.contains("page fallback failed"));
    }
}
