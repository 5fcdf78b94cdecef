//! Per-run accounting threaded through every stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topicpulse_core::Source;

use crate::normalize::SkippedRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceState {
    #[default]
    Ok,
    Failed {
        reason: String,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    #[serde(flatten)]
    pub state: SourceState,
    pub records_in: usize,
    pub normalized: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
    pub out_of_window: usize,
    pub after_dedupe: usize,
    /// Items from this source folded into another source's item.
    pub merged_cross_source: usize,
    /// Items kept by the per-source guarantee despite the relevance floor.
    pub guaranteed: usize,
    /// Items left out because their relevance was under the final floor.
    pub below_floor: usize,
    /// Items that cleared the floor but fell past `max_items`.
    pub capped: usize,
    pub in_report: usize,
}

/// One step of minimum-fill widening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relaxation {
    pub floor: f64,
    pub kept: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub required: usize,
    pub available: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    #[default]
    Complete,
    Partial,
    TotalFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub sources: BTreeMap<Source, SourceStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relaxations: Vec<Relaxation>,
    pub shortfall: Option<Shortfall>,
    /// Sources that sent more than one batch; only the first was used.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_batches: Vec<Source>,
    pub outcome: RunOutcome,
    /// Wall-clock duration, filled in by whoever owns the clock.
    pub elapsed_ms: Option<u64>,
}

impl RunStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_mut(&mut self, source: Source) -> &mut SourceStatus {
        self.sources.entry(source).or_default()
    }

    #[must_use]
    pub fn source(&self, source: Source) -> Option<&SourceStatus> {
        self.sources.get(&source)
    }

    pub fn mark_failed(&mut self, source: Source, reason: impl Into<String>) {
        self.source_mut(source).state = SourceState::Failed {
            reason: reason.into(),
        };
    }

    pub fn mark_skipped(&mut self, source: Source, reason: impl Into<String>) {
        self.source_mut(source).state = SourceState::Skipped {
            reason: reason.into(),
        };
    }

    /// Derive [`RunOutcome`] from the per-source states.
    pub fn settle_outcome(&mut self) -> RunOutcome {
        let ok = self
            .sources
            .values()
            .filter(|s| s.state == SourceState::Ok)
            .count();
        self.outcome = if ok == 0 {
            RunOutcome::TotalFailure
        } else if ok < self.sources.len() {
            RunOutcome::Partial
        } else {
            RunOutcome::Complete
        };
        self.outcome
    }
}
