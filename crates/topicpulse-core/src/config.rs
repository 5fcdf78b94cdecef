use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to pick up a `.env` file first.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the variables already in the process,
/// without reading `.env`.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let log_level = or_default("TOPICPULSE_LOG_LEVEL", "info");
    let pipeline_config_path = lookup("TOPICPULSE_PIPELINE_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let max_concurrent_fetches = parse_usize("TOPICPULSE_MAX_CONCURRENT_FETCHES", "4")?.clamp(
        AppConfig::MIN_CONCURRENT_FETCHES,
        AppConfig::MAX_CONCURRENT_FETCHES,
    );

    let fetch_timeout_secs = parse_u64("TOPICPULSE_FETCH_TIMEOUT_SECS", "60")?;
    if fetch_timeout_secs == 0 {
        return Err(invalid(
            "TOPICPULSE_FETCH_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }

    let lookback_days = match lookup("TOPICPULSE_LOOKBACK_DAYS") {
        Ok(raw) => Some(parse_lookback_days(&raw)?),
        Err(_) => None,
    };

    Ok(AppConfig {
        log_level,
        pipeline_config_path,
        max_concurrent_fetches,
        fetch_timeout_secs,
        lookback_days,
    })
}

/// Parse a lookback window in days; accepted range is `1..=30`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for non-numeric or out-of-range input.
pub fn parse_lookback_days(raw: &str) -> Result<u32, ConfigError> {
    let var = "TOPICPULSE_LOOKBACK_DAYS";
    let days = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
    if (1..=AppConfig::MAX_LOOKBACK_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("must be within 1..={} (got {days})", AppConfig::MAX_LOOKBACK_DAYS),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
