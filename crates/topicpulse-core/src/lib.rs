//! Shared types for topicpulse: the uniform item model, pipeline tuning
//! configuration, and process configuration read from the environment.

pub mod app_config;
pub mod config;
pub mod item;
pub mod pipeline_config;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env, parse_lookback_days};
pub use item::{
    Counter, DateConfidence, Engagement, Item, ItemKey, ItemKind, SocialKind, Source,
};
pub use pipeline_config::{
    load_pipeline_config, parse_pipeline_config, AggregateConfig, DedupeConfig, NormalizeConfig,
    PipelineConfig, ScoringConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read pipeline config at {path}: {source}")]
    PipelineFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline config: {0}")]
    PipelineFileParse(#[from] serde_yaml::Error),

    #[error("invalid pipeline config: {0}")]
    Validation(String),
}
