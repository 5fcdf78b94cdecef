//! Per-source normalization of raw result records into [`Item`]s.
//!
//! Each source has its own raw shape and one function that maps it; the
//! dispatch in [`normalize`] is an exhaustive match on [`Source`], so adding a
//! source fails to compile until it has a normalizer. Records that cannot be
//! mapped are skipped and reported, never raised.

mod reddit;
mod web;
pub mod window;
mod x;
mod youtube;

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use topicpulse_core::{DateConfidence, Engagement, Item, ItemKind, NormalizeConfig, Source};

use crate::url::canonicalize;

pub use window::apply_window;

/// Why a single raw record was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "defect", content = "detail", rename_all = "snake_case")]
pub enum RecordDefect {
    #[error("record does not match the expected shape: {0}")]
    Malformed(String),

    #[error("record has no url")]
    MissingUrl,

    #[error("record has no title or text")]
    MissingText,

    #[error("duplicate id {0} within source")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Zero-based position in the raw batch.
    pub index: usize,
    #[serde(flatten)]
    pub defect: RecordDefect,
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub items: Vec<Item>,
    pub skipped: Vec<SkippedRecord>,
}

/// Map one source's raw records to items.
///
/// Pure and infallible: every record either becomes an [`Item`] or a
/// [`SkippedRecord`].
#[must_use]
pub fn normalize(source: Source, records: &[Value], config: &NormalizeConfig) -> Normalized {
    let mapped: Vec<Result<Mapped, RecordDefect>> = records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let position = index + 1;
            match source {
                Source::Reddit => reddit::normalize_thread(raw, position, config),
                Source::X => x::normalize_post(raw, position, config),
                Source::YouTube => youtube::normalize_video(raw, position, config),
                Source::Web => web::normalize_page(raw, position, config),
            }
        })
        .collect();

    // Generated ids must never take an id a record carries itself, even one
    // that appears later in the batch.
    let native_ids: HashSet<String> = mapped
        .iter()
        .filter_map(|m| m.as_ref().ok())
        .filter(|m| !m.id_generated)
        .map(|m| m.item.id.clone())
        .collect();

    let mut out = Normalized::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (index, result) in mapped.into_iter().enumerate() {
        let defect = match result {
            Ok(Mapped {
                mut item,
                id_generated: true,
            }) => {
                let id = free_id(&item.id, |id| {
                    native_ids.contains(id) || seen_ids.contains(id)
                });
                if id != item.id {
                    reassign_id(&mut item, id);
                }
                seen_ids.insert(item.id.clone());
                out.items.push(item);
                continue;
            }
            Ok(Mapped { item, .. }) if seen_ids.insert(item.id.clone()) => {
                out.items.push(item);
                continue;
            }
            Ok(Mapped { item, .. }) => RecordDefect::DuplicateId(item.id),
            Err(defect) => defect,
        };

        tracing::warn!(source = %source, index, defect = %defect, "skipping raw record");
        out.skipped.push(SkippedRecord { index, defect });
    }

    tracing::debug!(
        source = %source,
        records = records.len(),
        normalized = out.items.len(),
        skipped = out.skipped.len(),
        "normalized source batch"
    );
    out
}

fn parse_record<'a, T: Deserialize<'a>>(raw: &'a Value) -> Result<T, RecordDefect> {
    T::deserialize(raw).map_err(|e| RecordDefect::Malformed(e.to_string()))
}

/// Where a date came from. Structured timestamps are trusted more than
/// free-form date strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrigin {
    Timestamp,
    DateString,
}

impl DateOrigin {
    fn default_confidence(self) -> DateConfidence {
        match self {
            DateOrigin::Timestamp => DateConfidence::High,
            DateOrigin::DateString => DateConfidence::Medium,
        }
    }
}

/// Resolve a date and its confidence. An explicit confidence on the record
/// wins; a missing date is always `Unknown`.
fn resolve_date(
    date: Option<(NaiveDate, DateOrigin)>,
    explicit_confidence: Option<&str>,
) -> (Option<NaiveDate>, DateConfidence) {
    let Some((date, origin)) = date else {
        return (None, DateConfidence::Unknown);
    };
    let confidence = explicit_confidence
        .and_then(DateConfidence::parse_loose)
        .unwrap_or_else(|| origin.default_confidence());
    if confidence == DateConfidence::Unknown {
        return (None, DateConfidence::Unknown);
    }
    (Some(date), confidence)
}

/// Accepts `YYYY-MM-DD`, `YYYYMMDD`, RFC 3339 and the classic
/// `Wed Oct 10 20:19:24 +0000 2018` timestamp format.
fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(raw, "%Y%m%d").ok();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y") {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[allow(clippy::cast_possible_truncation)]
fn date_from_unix(secs: f64) -> Option<NaiveDate> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.date_naive())
}

/// Lenient counter: accepts integers, non-negative floats, numeric strings
/// and null. Anything else is treated as not reported.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => s.trim().replace(',', "").parse::<u64>().ok(),
        _ => None,
    }
}

/// Ids arrive as strings or numbers depending on the tool.
fn id_from_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// An item plus whether its id was generated from the record's position
/// rather than carried by the record.
#[derive(Debug)]
pub(super) struct Mapped {
    pub(super) item: Item,
    pub(super) id_generated: bool,
}

/// Fields shared by every source, assembled by the per-source functions and
/// turned into an [`Item`] by [`Draft::finish`].
struct Draft {
    source: Source,
    /// Id carried by the record; a positional id is used when absent.
    id: Option<String>,
    /// One-based position in the batch.
    position: usize,
    kind: ItemKind,
    title_or_text: String,
    url: String,
    author_or_channel: String,
    date: Option<(NaiveDate, DateOrigin)>,
    date_confidence: Option<String>,
    engagement: Engagement,
    enrichment: Option<String>,
    relevance: Option<f64>,
    why_relevant: Option<String>,
}

impl Draft {
    fn finish(self, config: &NormalizeConfig) -> Result<Mapped, RecordDefect> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return Err(RecordDefect::MissingUrl);
        }
        let title_or_text = crate::text::collapse_whitespace(&self.title_or_text);
        if title_or_text.is_empty() {
            return Err(RecordDefect::MissingText);
        }

        let (published_at, date_confidence) =
            resolve_date(self.date, self.date_confidence.as_deref());

        let (relevance, relevance_supplied) = match self.relevance.filter(|r| r.is_finite()) {
            Some(r) => (r.clamp(0.0, 1.0), true),
            None => (config.default_relevance_for(self.source), false),
        };

        let enrichment = self
            .enrichment
            .map(|text| crate::text::truncate_words(&text, config.transcript_max_words))
            .filter(|text| !text.is_empty());

        let id_generated = self.id.is_none();
        let id = self
            .id
            .unwrap_or_else(|| positional_id(self.source, self.position));

        let item = Item {
            id,
            source: self.source,
            sources: BTreeSet::from([self.source]),
            kind: self.kind,
            title_or_text,
            canonical_url: canonicalize(&url),
            url,
            author_or_channel: self.author_or_channel.trim().to_string(),
            published_at,
            date_confidence,
            engagement: self.engagement,
            enrichment,
            relevance,
            relevance_supplied,
            engagement_score: None,
            score: None,
            why_relevant: self.why_relevant.unwrap_or_default().trim().to_string(),
            merged_from: Vec::new(),
        };
        Ok(Mapped { item, id_generated })
    }
}

fn positional_id(source: Source, position: usize) -> String {
    format!("{}{position}", source.id_prefix())
}

/// `base` if it is free, otherwise the first free `base-1`, `base-2`, ...
fn free_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Move a generated id, keeping a video id that was derived from it in step.
fn reassign_id(item: &mut Item, id: String) {
    if let ItemKind::Video { video_id, .. } = &mut item.kind {
        if *video_id == item.id {
            video_id.clone_from(&id);
        }
    }
    item.id = id;
}
