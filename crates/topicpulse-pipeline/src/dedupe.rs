//! Near-duplicate removal.
//!
//! Items are visited in representative order (highest engagement first), and
//! each one either becomes a new representative or is merged into the first
//! representative it duplicates. Representatives are therefore pairwise
//! distinct under the duplicate predicate, which makes a second pass a no-op.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use topicpulse_core::{DedupeConfig, Item, ItemKey, Source};

use crate::text::{jaccard, tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeReason {
    UrlMatch,
    SimilarText,
    SimilarTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub kept: ItemKey,
    pub dropped: ItemKey,
    pub reason: MergeReason,
}

#[derive(Debug, Default)]
pub struct Deduped {
    pub items: Vec<Item>,
    pub merges: Vec<MergeRecord>,
}

/// Known dates first, earliest first.
pub(crate) fn earlier_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Engagement desc, relevance desc, earlier date, source, id.
fn representative_order(a: &Item, b: &Item) -> Ordering {
    b.engagement_or_zero()
        .total_cmp(&a.engagement_or_zero())
        .then_with(|| b.relevance.total_cmp(&a.relevance))
        .then_with(|| earlier_first(a.published_at, b.published_at))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.id.cmp(&b.id))
}

/// Token sets compared for same-source duplicates.
enum Signature {
    Text(HashSet<String>),
    TitleAndAttribution {
        title: HashSet<String>,
        attribution: HashSet<String>,
    },
}

impl Signature {
    fn of(item: &Item) -> Self {
        if item.kind.is_short_text() {
            Signature::Text(tokens(&item.title_or_text))
        } else {
            Signature::TitleAndAttribution {
                title: tokens(&item.title_or_text),
                attribution: tokens(&item.author_or_channel),
            }
        }
    }

    fn duplicate_of(&self, other: &Signature, config: &DedupeConfig) -> Option<MergeReason> {
        match (self, other) {
            (Signature::Text(a), Signature::Text(b)) => {
                (jaccard(a, b) >= config.social_jaccard_threshold)
                    .then_some(MergeReason::SimilarText)
            }
            (
                Signature::TitleAndAttribution {
                    title: ta,
                    attribution: aa,
                },
                Signature::TitleAndAttribution {
                    title: tb,
                    attribution: ab,
                },
            ) => (jaccard(ta, tb) >= config.title_jaccard_threshold
                && jaccard(aa, ab) >= config.attribution_jaccard_threshold)
                .then_some(MergeReason::SimilarTitle),
            _ => None,
        }
    }
}

fn absorb(kept: &mut Item, dropped: Item) {
    kept.sources.extend(dropped.sources.iter().copied());
    kept.merged_from.push(dropped.key());
    kept.merged_from.extend(dropped.merged_from);
}

/// Remove near-duplicates, returning the representatives in representative
/// order.
#[must_use]
pub fn dedupe(items: Vec<Item>, config: &DedupeConfig) -> Vec<Item> {
    dedupe_with_report(items, config).items
}

/// Like [`dedupe`], also reporting every merge.
///
/// An exact canonical-URL match is a duplicate across sources. Content
/// similarity is only checked between items of the same source.
#[must_use]
pub fn dedupe_with_report(mut items: Vec<Item>, config: &DedupeConfig) -> Deduped {
    items.sort_by(representative_order);

    let mut kept: Vec<Item> = Vec::with_capacity(items.len());
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut by_source: HashMap<Source, Vec<(usize, Signature)>> = HashMap::new();
    let mut merges = Vec::new();

    for item in items {
        if let Some(&idx) = by_url.get(&item.canonical_url) {
            merges.push(MergeRecord {
                kept: kept[idx].key(),
                dropped: item.key(),
                reason: MergeReason::UrlMatch,
            });
            absorb(&mut kept[idx], item);
            continue;
        }

        let signature = Signature::of(&item);
        let matched = by_source.get(&item.source).and_then(|reps| {
            reps.iter()
                .find_map(|(idx, rep)| signature.duplicate_of(rep, config).map(|r| (*idx, r)))
        });
        if let Some((idx, reason)) = matched {
            merges.push(MergeRecord {
                kept: kept[idx].key(),
                dropped: item.key(),
                reason,
            });
            absorb(&mut kept[idx], item);
            continue;
        }

        let idx = kept.len();
        by_url.insert(item.canonical_url.clone(), idx);
        by_source
            .entry(item.source)
            .or_default()
            .push((idx, signature));
        kept.push(item);
    }

    Deduped {
        items: kept,
        merges,
    }
}
