use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Directory finished downloads are written to
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            download_dir: default_download_dir(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(16 * 1024 * 1024) // 16 MB
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Bounded queue length per worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_pool_size() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_task_ttl_hours")]
    pub task_ttl_hours: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            task_ttl_hours: default_task_ttl_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_task_ttl_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

/// Extraction engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Path to `yt-dlp`; looked up in PATH when unset
    pub binary: Option<PathBuf>,
    /// Netscape cookies file passed to YouTube requests
    pub cookies_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: None,
            cookies_file: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    3600
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:5000");
        assert_eq!(config.server.max_payload_bytes.as_u64(), 16 * 1024 * 1024);
        assert_eq!(config.server.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.workers.pool_size, 4);
        assert_eq!(config.workers.queue_capacity, 64);
        assert_eq!(config.retention.task_ttl_hours, 24);
        assert_eq!(config.engine.timeout_secs, 3600);
        assert!(config.engine.binary.is_none());
        assert!(config.engine.user_agent.starts_with("Mozilla/5.0"));
    }
}
