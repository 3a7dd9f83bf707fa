use super::models::Config;
use thiserror::Error;

/// Ten years
const MAX_TTL_HOURS: u64 = 10 * 365 * 24;
/// One year
const MAX_SWEEP_INTERVAL_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("engine.user_agent must not be empty")]
    EmptyUserAgent,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_workers(config)?;
    validate_retention(config)?;
    validate_engine(config)?;
    Ok(())
}

fn positive(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

fn at_most(field: &'static str, value: u64, max: u64) -> Result<(), ValidationError> {
    if value > max {
        return Err(ValidationError::TooLarge { field, max });
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    positive(
        "server.max_payload_bytes",
        config.server.max_payload_bytes.as_u64(),
    )
}

fn validate_workers(config: &Config) -> Result<(), ValidationError> {
    positive("workers.pool_size", config.workers.pool_size as u64)?;
    positive("workers.queue_capacity", config.workers.queue_capacity as u64)
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    let retention = &config.retention;
    positive("retention.task_ttl_hours", retention.task_ttl_hours)?;
    at_most("retention.task_ttl_hours", retention.task_ttl_hours, MAX_TTL_HOURS)?;
    positive("retention.sweep_interval_secs", retention.sweep_interval_secs)?;
    at_most(
        "retention.sweep_interval_secs",
        retention.sweep_interval_secs,
        MAX_SWEEP_INTERVAL_SECS,
    )
}

fn validate_engine(config: &Config) -> Result<(), ValidationError> {
    positive("engine.timeout_secs", config.engine.timeout_secs)?;
    if config.engine.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }
    Ok(())
}
