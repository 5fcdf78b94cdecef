mod collect;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use topicpulse_core::{AppConfig, Item, ItemKey, PipelineConfig, Source};
use topicpulse_pipeline::{run_pipeline, Report, RunInput, RunStatus};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "topicpulse")]
#[command(about = "Rank recent Reddit, X, YouTube, and web results for a topic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the pipeline over raw result files and print the ranked report.
    Run {
        topic: String,
        /// Directory holding `reddit.json`, `x.json`, `youtube.json`, `web.json`.
        #[arg(long)]
        input_dir: PathBuf,
        /// Comma-separated subset of sources.
        #[arg(long, value_delimiter = ',', value_parser = parse_source)]
        sources: Option<Vec<Source>>,
        /// Pipeline tuning file; overrides `TOPICPULSE_PIPELINE_CONFIG`.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Lookback window in days (1-30).
        #[arg(long, value_parser = parse_days)]
        days: Option<u32>,
    },
    /// Show which sources have input files.
    Diagnose {
        #[arg(long)]
        input_dir: PathBuf,
    },
}

fn parse_source(raw: &str) -> Result<Source, String> {
    raw.parse()
}

fn parse_days(raw: &str) -> Result<u32, String> {
    topicpulse_core::parse_lookback_days(raw).map_err(|e| e.to_string())
}

/// A ranked item as printed, with its persistence key and fingerprint.
#[derive(Serialize)]
struct RenderedItem<'a> {
    key: ItemKey,
    fingerprint: String,
    #[serde(flatten)]
    item: &'a Item,
}

#[derive(Serialize)]
struct RenderedReport<'a> {
    topic: &'a str,
    items: Vec<RenderedItem<'a>>,
    status: &'a RunStatus,
}

impl<'a> From<&'a Report> for RenderedReport<'a> {
    fn from(report: &'a Report) -> Self {
        Self {
            topic: &report.topic,
            items: report
                .items
                .iter()
                .map(|item| RenderedItem {
                    key: item.key(),
                    fingerprint: item.fingerprint(),
                    item,
                })
                .collect(),
            status: &report.status,
        }
    }
}

fn load_pipeline(
    app: &AppConfig,
    override_path: Option<PathBuf>,
    days: Option<u32>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match override_path.or_else(|| app.pipeline_config_path.clone()) {
        Some(path) => topicpulse_core::load_pipeline_config(&path)
            .with_context(|| format!("loading pipeline config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(days) = days.or(app.lookback_days) {
        config.normalize.lookback_days = days;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = topicpulse_core::load_app_config()?;
    // Logs go to stderr; stdout carries the JSON report.
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(app.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            topic,
            input_dir,
            sources,
            config,
            days,
        } => {
            let pipeline = load_pipeline(&app, config, days)?;
            let sources = sources.unwrap_or_else(|| Source::ALL.to_vec());
            let started = Instant::now();

            let batches = collect::load_batches(
                &input_dir,
                &sources,
                app.max_concurrent_fetches,
                Duration::from_secs(app.fetch_timeout_secs),
            )
            .await;

            let mut report = run_pipeline(
                RunInput {
                    topic,
                    batches,
                    now: chrono::Utc::now(),
                },
                &pipeline,
            );
            report.status.elapsed_ms =
                Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

            let rendered = RenderedReport::from(&report);
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        Commands::Diagnose { input_dir } => {
            let found: serde_json::Map<String, serde_json::Value> =
                collect::available_sources(&input_dir)
                    .into_iter()
                    .map(|(source, present)| (source.to_string(), present.into()))
                    .collect();
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
    }

    Ok(())
}
