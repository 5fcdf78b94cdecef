use std::path::PathBuf;

/// Process-level settings read from the environment. Pipeline tuning lives in
/// [`crate::PipelineConfig`]; this only carries what the binary needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: String,
    /// Optional YAML file with pipeline overrides.
    pub pipeline_config_path: Option<PathBuf>,
    /// Upper bound on sources loaded at the same time. Always within `1..=5`.
    pub max_concurrent_fetches: usize,
    pub fetch_timeout_secs: u64,
    /// Overrides `normalize.lookback_days` from the pipeline file when set.
    pub lookback_days: Option<u32>,
}

impl AppConfig {
    pub const MIN_CONCURRENT_FETCHES: usize = 1;
    pub const MAX_CONCURRENT_FETCHES: usize = 5;
    pub const MAX_LOOKBACK_DAYS: u32 = 30;
}
