//! Global merge, final scoring, relevance floor, and ranking.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use topicpulse_core::{AggregateConfig, Item, PipelineConfig, Source};

use crate::dedupe::{dedupe_with_report, earlier_first};
use crate::score::final_score;
use crate::status::{Relaxation, RunStatus, Shortfall};

/// One source's items after its own dedupe pass.
#[derive(Debug, Clone)]
pub struct SourceItems {
    pub source: Source,
    pub items: Vec<Item>,
}

#[derive(Debug)]
pub struct Aggregated {
    pub items: Vec<Item>,
    pub status: RunStatus,
}

/// Score desc, engagement desc, earlier date (unknown last), source, id.
fn rank_order(a: &Item, b: &Item) -> Ordering {
    b.score
        .unwrap_or(0)
        .cmp(&a.score.unwrap_or(0))
        .then_with(|| b.engagement_or_zero().total_cmp(&a.engagement_or_zero()))
        .then_with(|| earlier_first(a.published_at, b.published_at))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.id.cmp(&b.id))
}

/// Indexes into `ranked` that survive `floor`, plus per-source guarantees for
/// sources whose every item fell below it.
fn select(
    ranked: &[Item],
    floor: f64,
    config: &AggregateConfig,
) -> (BTreeSet<usize>, BTreeMap<Source, usize>) {
    let mut chosen: BTreeSet<usize> = ranked
        .iter()
        .enumerate()
        .filter(|(_, item)| item.relevance >= floor)
        .map(|(idx, _)| idx)
        .collect();

    let contributing: BTreeSet<Source> = ranked.iter().map(|i| i.source).collect();
    let mut guaranteed = BTreeMap::new();
    for source in contributing {
        if chosen.iter().any(|&idx| ranked[idx].source == source) {
            continue;
        }
        let mut candidates: Vec<usize> = ranked
            .iter()
            .enumerate()
            .filter(|(_, item)| item.source == source)
            .map(|(idx, _)| idx)
            .collect();
        // Best relevance first; rank order breaks ties since `ranked` is sorted.
        candidates.sort_by(|&a, &b| ranked[b].relevance.total_cmp(&ranked[a].relevance));
        candidates.truncate(config.min_per_source);
        if !candidates.is_empty() {
            guaranteed.insert(source, candidates.len());
            chosen.extend(candidates);
        }
    }
    (chosen, guaranteed)
}

/// Merge every source's items into one ranked report.
///
/// Runs the cross-source dedupe pass, assigns final scores, applies the
/// relevance floor (widening it while the report is under-filled), sorts,
/// and records per-source counts in `status`.
#[must_use]
pub fn aggregate(
    per_source: Vec<SourceItems>,
    today: NaiveDate,
    config: &PipelineConfig,
    mut status: RunStatus,
) -> Aggregated {
    let pool: Vec<Item> = per_source.into_iter().flat_map(|s| s.items).collect();
    let deduped = dedupe_with_report(pool, &config.dedupe);

    for merge in &deduped.merges {
        if merge.kept.source != merge.dropped.source {
            status.source_mut(merge.dropped.source).merged_cross_source += 1;
        }
    }

    let mut ranked = deduped.items;
    for item in &mut ranked {
        item.score = Some(final_score(item, today, &config.scoring));
    }
    ranked.sort_by(rank_order);

    let agg = &config.aggregate;
    let (mut chosen, mut guaranteed) = select(&ranked, agg.min_relevance, agg);
    for &floor in &agg.relaxed_relevance_floors {
        if chosen.len() >= agg.min_items || chosen.len() == ranked.len() {
            break;
        }
        (chosen, guaranteed) = select(&ranked, floor, agg);
        tracing::warn!(floor, kept = chosen.len(), "relaxed relevance floor");
        status.relaxations.push(Relaxation {
            floor,
            kept: chosen.len(),
        });
    }

    if chosen.len() < agg.min_items {
        tracing::warn!(
            required = agg.min_items,
            available = chosen.len(),
            "report is under-filled"
        );
        status.shortfall = Some(Shortfall {
            required: agg.min_items,
            available: chosen.len(),
        });
    }

    for (source, count) in guaranteed {
        status.source_mut(source).guaranteed = count;
    }

    for source_status in status.sources.values_mut() {
        source_status.below_floor = 0;
        source_status.capped = 0;
        source_status.in_report = 0;
    }

    // `ranked` is in rank order, so the kept items stay sorted.
    let mut items: Vec<Item> = Vec::with_capacity(chosen.len());
    for (idx, item) in ranked.into_iter().enumerate() {
        if chosen.contains(&idx) {
            items.push(item);
        } else {
            status.source_mut(item.source).below_floor += 1;
        }
    }
    if let Some(max) = agg.max_items {
        for item in items.iter().skip(max) {
            status.source_mut(item.source).capped += 1;
        }
        items.truncate(max);
    }

    for item in &items {
        status.source_mut(item.source).in_report += 1;
    }

    tracing::debug!(
        merges = deduped.merges.len(),
        in_report = items.len(),
        "aggregated sources"
    );

    Aggregated { items, status }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use topicpulse_core::{DateConfidence, Engagement, ItemKind, SocialKind};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()
    }

    fn thread(id: &str, relevance: f64, engagement: f64) -> Item {
        Item {
            id: id.to_string(),
            source: Source::Reddit,
            sources: BTreeSet::from([Source::Reddit]),
            kind: ItemKind::Social {
                kind: SocialKind::Thread {
                    subreddit: "rust".to_string(),
                },
            },
            title_or_text: format!("distinct thread {id}"),
            url: format!("https://reddit.com/r/rust/comments/{id}"),
            canonical_url: format!("https://reddit.com/r/rust/comments/{id}"),
            author_or_channel: "r/rust".to_string(),
            published_at: None,
            date_confidence: DateConfidence::Unknown,
            engagement: Engagement::default(),
            enrichment: None,
            relevance,
            relevance_supplied: true,
            engagement_score: Some(engagement),
            score: None,
            why_relevant: String::new(),
            merged_from: Vec::new(),
        }
    }

    fn web(id: &str, relevance: f64) -> Item {
        let mut item = thread(id, relevance, 0.0);
        item.source = Source::Web;
        item.sources = BTreeSet::from([Source::Web]);
        item.kind = ItemKind::Web {
            source_domain: "example.com".to_string(),
        };
        item.url = format!("https://example.com/{id}");
        item.canonical_url = item.url.clone();
        item.author_or_channel = format!("author {id}");
        item
    }

    fn loose() -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.aggregate.min_items = 1;
        cfg
    }

    #[test]
    fn ranks_by_score_then_engagement() {
        let per_source = vec![SourceItems {
            source: Source::Reddit,
            items: vec![
                thread("R1", 0.6, 1.0),
                thread("R2", 0.9, 1.0),
                thread("R3", 0.6, 5.0),
            ],
        }];
        let out = aggregate(per_source, today(), &loose(), RunStatus::new());
        let ids: Vec<&str> = out.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["R2", "R3", "R1"]);
        assert!(out.items.iter().all(|i| i.score.is_some()));
        assert_eq!(out.status.source(Source::Reddit).unwrap().in_report, 3);
    }

    #[test]
    fn floor_removes_weak_items() {
        let per_source = vec![SourceItems {
            source: Source::Reddit,
            items: vec![thread("R1", 0.9, 0.0), thread("R2", 0.1, 0.0)],
        }];
        let out = aggregate(per_source, today(), &loose(), RunStatus::new());
        assert_eq!(out.items.len(), 1);
        assert!(out.status.relaxations.is_empty());
        assert!(out.status.shortfall.is_none());
        let reddit = out.status.source(Source::Reddit).unwrap();
        assert_eq!(reddit.below_floor, 1);
        assert_eq!(reddit.in_report, 1);
    }

    #[test]
    fn widening_then_shortfall() {
        let per_source = vec![SourceItems {
            source: Source::Reddit,
            items: vec![
                thread("R1", 0.9, 0.0),
                thread("R2", 0.2, 0.0),
                thread("R3", 0.05, 0.0),
            ],
        }];
        let out = aggregate(
            per_source,
            today(),
            &PipelineConfig::default(),
            RunStatus::new(),
        );
        assert_eq!(out.items.len(), 3);
        assert_eq!(
            out.status.relaxations,
            vec![
                Relaxation {
                    floor: 0.15,
                    kept: 2
                },
                Relaxation {
                    floor: 0.0,
                    kept: 3
                },
            ]
        );
        assert_eq!(
            out.status.shortfall,
            Some(Shortfall {
                required: 5,
                available: 3
            })
        );
    }

    #[test]
    fn filtered_out_source_keeps_its_best_items() {
        let mut cfg = loose();
        cfg.aggregate.min_per_source = 2;
        let per_source = vec![
            SourceItems {
                source: Source::Reddit,
                items: vec![thread("R1", 0.9, 0.0)],
            },
            SourceItems {
                source: Source::Web,
                items: vec![web("W1", 0.1), web("W2", 0.2), web("W3", 0.05)],
            },
        ];
        let out = aggregate(per_source, today(), &cfg, RunStatus::new());
        let mut ids: Vec<&str> = out.items.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["R1", "W1", "W2"]);
        let web = out.status.source(Source::Web).unwrap();
        assert_eq!(web.guaranteed, 2);
        assert_eq!(web.in_report, 2);
        assert_eq!(web.below_floor, 1);
    }

    #[test]
    fn cross_source_merges_are_counted_on_the_dropped_source() {
        let mut dup = web("W1", 0.9);
        dup.url = "https://reddit.com/r/rust/comments/R1".to_string();
        dup.canonical_url = dup.url.clone();
        let per_source = vec![
            SourceItems {
                source: Source::Reddit,
                items: vec![thread("R1", 0.9, 3.0)],
            },
            SourceItems {
                source: Source::Web,
                items: vec![dup],
            },
        ];
        let out = aggregate(per_source, today(), &loose(), RunStatus::new());
        assert_eq!(out.items.len(), 1);
        assert_eq!(
            out.items[0].sources,
            BTreeSet::from([Source::Reddit, Source::Web])
        );
        assert_eq!(out.status.source(Source::Web).unwrap().merged_cross_source, 1);
    }

    #[test]
    fn cap_limits_total() {
        let mut cfg = loose();
        cfg.aggregate.max_items = Some(2);
        let per_source = vec![SourceItems {
            source: Source::Reddit,
            items: (1..=5).map(|n| thread(&format!("R{n}"), 0.9, 0.0)).collect(),
        }];
        let out = aggregate(per_source, today(), &cfg, RunStatus::new());
        assert_eq!(out.items.len(), 2);
        let reddit = out.status.source(Source::Reddit).unwrap();
        assert_eq!(reddit.capped, 3);
        assert_eq!(reddit.below_floor, 0);
        assert_eq!(reddit.in_report, 2);
        assert!(out.status.shortfall.is_none());
    }

    #[test]
    fn empty_input_reports_shortfall() {
        let out = aggregate(
            Vec::new(),
            today(),
            &PipelineConfig::default(),
            RunStatus::new(),
        );
        assert!(out.items.is_empty());
        assert!(out.status.relaxations.is_empty());
        assert_eq!(
            out.status.shortfall,
            Some(Shortfall {
                required: 5,
                available: 0
            })
        );
    }
}
