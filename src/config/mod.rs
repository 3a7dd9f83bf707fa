//! Configuration management for vidfetch
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use vidfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `VIDFETCH__<section>__<key>`:
//! - `VIDFETCH__SERVER__BIND_ADDR=127.0.0.1:8000`
//! - `VIDFETCH__WORKERS__POOL_SIZE=8`
//! - `VIDFETCH__ENGINE__COOKIES_FILE=/etc/vidfetch/cookies.txt`
//!
//! # Configuration File
//!
//! The file defaults to `config/vidfetch.toml` and can be moved with the
//! `VIDFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, EngineConfig, RetentionConfig, ServerConfig, WorkerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value fails
    /// validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[workers]\npool_size = 1\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.workers.pool_size, 1);
        assert_eq!(config.retention.task_ttl_hours, 24);
    }

    #[test]
    fn test_validation_runs_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[workers]\nqueue_capacity = 0\n").unwrap();

        assert!(matches!(
            Config::load_from_path(config_path),
            Err(ConfigError::ValidationError(ValidationError::NotPositive {
                field: "workers.queue_capacity"
            }))
        ));
    }
}
