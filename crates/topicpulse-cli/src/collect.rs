//! Loads each source's raw results from disk, a bounded number at a time.
//!
//! Stands in for the search tools: every source is an independent task with
//! its own timeout, and whatever goes wrong becomes a [`SourceBatch`]
//! outcome rather than an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use topicpulse_core::Source;
use topicpulse_pipeline::SourceBatch;

#[must_use]
pub(crate) fn source_path(dir: &Path, source: Source) -> PathBuf {
    dir.join(format!("{source}.json"))
}

/// Accepts a bare JSON array or an object wrapping it under `items`.
pub(crate) fn parse_records(text: &str) -> Result<Vec<Value>, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err("\"items\" is not an array".to_string()),
            None => Err("expected an array or an object with \"items\"".to_string()),
        },
        _ => Err("expected an array or an object with \"items\"".to_string()),
    }
}

async fn load_source(dir: &Path, source: Source) -> SourceBatch {
    let path = source_path(dir, source);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return SourceBatch::skipped(source, format!("no input at {}", path.display()));
        }
        Err(e) => {
            return SourceBatch::failed(source, format!("reading {}: {e}", path.display()));
        }
    };
    match parse_records(&text) {
        Ok(records) => {
            tracing::debug!(source = %source, records = records.len(), "loaded source input");
            SourceBatch::records(source, records)
        }
        Err(reason) => SourceBatch::failed(source, format!("{}: {reason}", path.display())),
    }
}

/// Load every requested source with at most `max_concurrent` in flight.
///
/// A source that exceeds `timeout` is reported as failed. Batches come back
/// in `sources` order regardless of completion order.
pub(crate) async fn load_batches(
    dir: &Path,
    sources: &[Source],
    max_concurrent: usize,
    timeout: Duration,
) -> Vec<SourceBatch> {
    let mut batches: Vec<(usize, SourceBatch)> = stream::iter(sources.iter().copied().enumerate())
        .map(|(position, source)| async move {
            let batch = match tokio::time::timeout(timeout, load_source(dir, source)).await {
                Ok(batch) => batch,
                Err(_) => {
                    tracing::warn!(
                        source = %source,
                        timeout_secs = timeout.as_secs(),
                        "source timed out"
                    );
                    SourceBatch::failed(
                        source,
                        format!("timed out after {}s", timeout.as_secs()),
                    )
                }
            };
            (position, batch)
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;
    batches.sort_by_key(|(position, _)| *position);
    batches.into_iter().map(|(_, batch)| batch).collect()
}

/// Which sources have an input file in `dir`.
pub(crate) fn available_sources(dir: &Path) -> Vec<(Source, bool)> {
    Source::ALL
        .iter()
        .map(|&source| (source, source_path(dir, source).is_file()))
        .collect()
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
