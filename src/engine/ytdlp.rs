//! `yt-dlp` child-process engine

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{EngineError, EngineOptions, ExtractionEngine, RawVideoInfo};
use crate::config::EngineConfig;

const BINARY_NAME: &str = "yt-dlp";

/// Engine that shells out to the `yt-dlp` binary
///
/// Child processes are spawned with `kill_on_drop`, so dropping an
/// in-flight call (cancellation, timeout) terminates the process.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl YtDlpEngine {
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    /// Build from config, looking the binary up in PATH when not configured
    pub fn from_config(config: &EngineConfig) -> Self {
        let binary = match &config.binary {
            Some(path) => path.clone(),
            None => which::which(BINARY_NAME).unwrap_or_else(|_| {
                warn!("{BINARY_NAME} not found in PATH; extraction calls will fail");
                PathBuf::from(BINARY_NAME)
            }),
        };

        Self::new(binary, Duration::from_secs(config.timeout_secs))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Output, EngineError> {
        debug!(binary = %self.binary.display(), ?args, "Running engine");

        let mut command = Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))?
            .map_err(EngineError::Spawn)?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: last_error_line(&output.stderr),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        BINARY_NAME
    }

    async fn probe(&self, url: &str, opts: &EngineOptions) -> Result<RawVideoInfo, EngineError> {
        let output = self.run(probe_args(url, opts)).await?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn fetch(
        &self,
        url: &str,
        output: &Path,
        selector: &str,
        opts: &EngineOptions,
    ) -> Result<PathBuf, EngineError> {
        self.run(fetch_args(url, output, selector, opts)).await?;

        if !tokio::fs::try_exists(output).await? {
            return Err(EngineError::MissingOutput(output.to_path_buf()));
        }

        Ok(output.to_path_buf())
    }
}

fn common_args(opts: &EngineOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["--no-warnings", "--no-playlist", "--quiet"]
        .into_iter()
        .map(OsString::from)
        .collect();

    if let Some(cookies) = &opts.cookies_file {
        args.push("--cookies".into());
        args.push(cookies.into());
    }

    args
}

fn probe_args(url: &str, opts: &EngineOptions) -> Vec<OsString> {
    let mut args = common_args(opts);
    args.push("--dump-single-json".into());
    args.push(url.into());
    args
}

fn fetch_args(url: &str, output: &Path, selector: &str, opts: &EngineOptions) -> Vec<OsString> {
    let mut args = common_args(opts);
    args.extend([
        OsString::from("--format"),
        selector.into(),
        "--merge-output-format".into(),
        "mp4".into(),
        "--output".into(),
        output.into(),
    ]);
    args.push(url.into());
    args
}

fn last_error_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "no error output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_args_with_cookies() {
        let opts = EngineOptions {
            cookies_file: Some(PathBuf::from("/etc/cookies.txt")),
        };
        let args = probe_args("https://example.com/v", &opts);
        let args: Vec<&str> = args.iter().filter_map(|a| a.to_str()).collect();

        assert!(args.contains(&"--dump-single-json"));
        assert!(args.windows(2).any(|w| w == ["--cookies", "/etc/cookies.txt"]));
        assert_eq!(args.last(), Some(&"https://example.com/v"));
    }

    #[test]
    fn test_fetch_args_selector_and_output() {
        let args = fetch_args(
            "https://example.com/v",
            Path::new("/tmp/out.mp4"),
            "bestvideo+bestaudio/best",
            &EngineOptions::default(),
        );
        let args: Vec<&str> = args.iter().filter_map(|a| a.to_str()).collect();

        assert!(args.windows(2).any(|w| w == ["--format", "bestvideo+bestaudio/best"]));
        assert!(args.windows(2).any(|w| w == ["--output", "/tmp/out.mp4"]));
        assert!(!args.contains(&"--cookies"));
    }

    #[test]
    fn test_last_error_line() {
        let stderr = b"WARNING: something\nERROR: Video unavailable\n\n";
        assert_eq!(last_error_line(stderr), "ERROR: Video unavailable");
        assert_eq!(last_error_line(b""), "no error output");
    }

    #[test]
    fn test_raw_info_from_engine_json() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "duration": 212.0,
            "uploader": "Rick Astley",
            "formats": [{"format_id": "18", "ext": "mp4", "quality": 1}]
        }"#;
        let info: RawVideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(info.formats.len(), 1);
        assert!(info.thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let engine = YtDlpEngine::new(
            PathBuf::from("/nonexistent/yt-dlp-binary-xyz"),
            Duration::from_secs(5),
        );
        let err = engine
            .probe("https://example.com/v", &EngineOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn(_)));
    }
}
