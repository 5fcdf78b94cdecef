//! The topicpulse pipeline: normalize raw per-source results, score them,
//! remove near-duplicates, and rank everything into one report.
//!
//! The crate performs no I/O. Callers hand in each source's raw JSON records
//! (or the reason the source produced none) and get back ranked items plus a
//! [`RunStatus`] describing what happened to every source.

pub mod aggregate;
pub mod dedupe;
pub mod normalize;
pub mod pipeline;
pub mod score;
pub mod status;
pub mod text;
pub mod url;

pub use aggregate::{aggregate, Aggregated, SourceItems};
pub use dedupe::{dedupe, dedupe_with_report, Deduped, MergeReason, MergeRecord};
pub use normalize::{apply_window, normalize, Normalized, RecordDefect, SkippedRecord};
pub use pipeline::{run_pipeline, Report, RunInput, SourceBatch, SourceOutcome};
pub use score::{
    engagement_component, final_score, recency_factor, score_engagement, score_items,
    score_relevance,
};
pub use status::{Relaxation, RunOutcome, RunStatus, Shortfall, SourceState, SourceStatus};
