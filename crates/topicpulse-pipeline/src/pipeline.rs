//! End-to-end run: source outcomes in, ranked report out.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use topicpulse_core::{Item, PipelineConfig, Source};

use crate::aggregate::{aggregate, SourceItems};
use crate::dedupe::dedupe;
use crate::normalize::{apply_window, normalize};
use crate::score::score_items;
use crate::status::RunStatus;

/// What a collaborator got back from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SourceOutcome {
    Records { records: Vec<Value> },
    Failed { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    pub source: Source,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceBatch {
    #[must_use]
    pub fn records(source: Source, records: Vec<Value>) -> Self {
        Self {
            source,
            outcome: SourceOutcome::Records { records },
        }
    }

    #[must_use]
    pub fn failed(source: Source, reason: impl Into<String>) -> Self {
        Self {
            source,
            outcome: SourceOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub fn skipped(source: Source, reason: impl Into<String>) -> Self {
        Self {
            source,
            outcome: SourceOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunInput {
    pub topic: String,
    pub batches: Vec<SourceBatch>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub topic: String,
    pub items: Vec<Item>,
    pub status: RunStatus,
}

/// Normalize, window, score, and dedupe one source's records.
fn prepare_source(
    source: Source,
    records: &[Value],
    topic: &str,
    now: DateTime<Utc>,
    config: &PipelineConfig,
    status: &mut RunStatus,
) -> SourceItems {
    let normalized = normalize(source, records, &config.normalize);
    let (mut items, out_of_window) =
        apply_window(normalized.items, source, now.date_naive(), &config.normalize);
    score_items(&mut items, topic, config);
    let items = dedupe(items, &config.dedupe);

    let entry = status.source_mut(source);
    entry.records_in = records.len();
    entry.normalized = records.len() - normalized.skipped.len();
    entry.skipped = normalized.skipped;
    entry.out_of_window = out_of_window;
    entry.after_dedupe = items.len();

    SourceItems { source, items }
}

/// Run the whole pipeline over whatever the sources produced.
///
/// Never fails: source failures and under-filled reports are recorded in
/// [`RunStatus`]. When no source produced records the report is empty and
/// the outcome is [`RunOutcome::TotalFailure`](crate::RunOutcome::TotalFailure).
#[must_use]
pub fn run_pipeline(input: RunInput, config: &PipelineConfig) -> Report {
    let RunInput {
        topic,
        batches,
        now,
    } = input;
    let mut status = RunStatus::new();
    let mut seen: BTreeSet<Source> = BTreeSet::new();
    let mut per_source = Vec::new();

    for batch in batches {
        if !seen.insert(batch.source) {
            tracing::warn!(source = %batch.source, "ignoring repeated batch for source");
            status.ignored_batches.push(batch.source);
            continue;
        }
        match batch.outcome {
            SourceOutcome::Records { records } => {
                per_source.push(prepare_source(
                    batch.source,
                    &records,
                    &topic,
                    now,
                    config,
                    &mut status,
                ));
            }
            SourceOutcome::Failed { reason } => {
                tracing::warn!(source = %batch.source, reason = %reason, "source failed");
                status.mark_failed(batch.source, reason);
            }
            SourceOutcome::Skipped { reason } => {
                tracing::info!(source = %batch.source, reason = %reason, "source skipped");
                status.mark_skipped(batch.source, reason);
            }
        }
    }

    let outcome = status.settle_outcome();
    let aggregated = aggregate(per_source, now.date_naive(), config, status);

    tracing::info!(
        topic = %topic,
        items = aggregated.items.len(),
        outcome = ?outcome,
        "pipeline run finished"
    );

    Report {
        topic,
        items: aggregated.items,
        status: aggregated.status,
    }
}
