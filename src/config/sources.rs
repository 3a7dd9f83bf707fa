use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "VIDFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/vidfetch.toml";
const ENV_PREFIX: &str = "VIDFETCH";
const ENV_SEPARATOR: &str = "__";

/// Load configuration with priority (lowest first):
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and the environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // VIDFETCH__SERVER__BIND_ADDR -> server.bind_addr
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:5000");
        assert_eq!(config.workers.pool_size, 4);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
download_dir = "/var/lib/vidfetch"
max_payload_bytes = "1MB"

[workers]
pool_size = 2

[retention]
task_ttl_hours = 6

[engine]
binary = "/usr/local/bin/yt-dlp"
cookies_file = "/etc/vidfetch/cookies.txt"
timeout_secs = 600
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.download_dir, PathBuf::from("/var/lib/vidfetch"));
        assert_eq!(config.server.max_payload_bytes.as_u64(), 1024 * 1024);
        assert_eq!(config.workers.pool_size, 2);
        assert_eq!(config.workers.queue_capacity, 64);
        assert_eq!(config.retention.task_ttl_hours, 6);
        assert_eq!(config.retention.sweep_interval_secs, 3600);
        assert_eq!(
            config.engine.binary,
            Some(PathBuf::from("/usr/local/bin/yt-dlp"))
        );
        assert_eq!(config.engine.timeout_secs, 600);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[workers]\npool_size = \"many\"\n").unwrap();

        assert!(load_from_sources(config_path).is_err());
    }

    #[test]
    fn test_serialized_defaults_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("defaults.toml");

        let mut original = Config::default();
        original.workers.pool_size = 3;
        fs::write(&config_path, toml::to_string(&original).unwrap()).unwrap();

        let reloaded = load_from_sources(config_path).unwrap();
        assert_eq!(reloaded.workers.pool_size, 3);
        assert_eq!(
            reloaded.server.max_payload_bytes,
            original.server.max_payload_bytes
        );
        assert_eq!(reloaded.engine.user_agent, original.engine.user_agent);
    }
}
