use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_uses_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.pipeline_config_path.is_none());
    assert_eq!(cfg.max_concurrent_fetches, 4);
    assert_eq!(cfg.fetch_timeout_secs, 60);
    assert!(cfg.lookback_days.is_none());
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("TOPICPULSE_LOG_LEVEL", "debug");
    map.insert("TOPICPULSE_PIPELINE_CONFIG", "./config/pipeline.yaml");
    map.insert("TOPICPULSE_MAX_CONCURRENT_FETCHES", "3");
    map.insert("TOPICPULSE_FETCH_TIMEOUT_SECS", "15");
    map.insert("TOPICPULSE_LOOKBACK_DAYS", "7");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(
        cfg.pipeline_config_path,
        Some(PathBuf::from("./config/pipeline.yaml"))
    );
    assert_eq!(cfg.max_concurrent_fetches, 3);
    assert_eq!(cfg.fetch_timeout_secs, 15);
    assert_eq!(cfg.lookback_days, Some(7));
}

#[test]
fn blank_pipeline_config_path_is_ignored() {
    let mut map = HashMap::new();
    map.insert("TOPICPULSE_PIPELINE_CONFIG", "  ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.pipeline_config_path.is_none());
}

#[test]
fn max_concurrent_fetches_is_clamped() {
    let mut map = HashMap::new();
    map.insert("TOPICPULSE_MAX_CONCURRENT_FETCHES", "64");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.max_concurrent_fetches, 5);

    map.insert("TOPICPULSE_MAX_CONCURRENT_FETCHES", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.max_concurrent_fetches, 1);
}

#[test]
fn max_concurrent_fetches_invalid() {
    let mut map = HashMap::new();
    map.insert("TOPICPULSE_MAX_CONCURRENT_FETCHES", "lots");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOPICPULSE_MAX_CONCURRENT_FETCHES"),
        "expected InvalidEnvVar(TOPICPULSE_MAX_CONCURRENT_FETCHES), got: {result:?}"
    );
}

#[test]
fn zero_fetch_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TOPICPULSE_FETCH_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOPICPULSE_FETCH_TIMEOUT_SECS"),
        "expected InvalidEnvVar(TOPICPULSE_FETCH_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn lookback_days_out_of_range() {
    let mut map = HashMap::new();
    map.insert("TOPICPULSE_LOOKBACK_DAYS", "31");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOPICPULSE_LOOKBACK_DAYS"),
        "expected InvalidEnvVar(TOPICPULSE_LOOKBACK_DAYS), got: {result:?}"
    );
}

#[test]
fn parse_lookback_days_bounds() {
    assert_eq!(parse_lookback_days("1").unwrap(), 1);
    assert_eq!(parse_lookback_days(" 30 ").unwrap(), 30);
    assert!(parse_lookback_days("0").is_err());
    assert!(parse_lookback_days("week").is_err());
}
