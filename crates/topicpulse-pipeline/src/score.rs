//! Engagement, relevance, recency, and the final rank score.
//!
//! Everything here is a pure function of item fields, configuration, and the
//! caller's `today`.

use chrono::NaiveDate;
use topicpulse_core::{Item, NormalizeConfig, PipelineConfig, ScoringConfig};

use crate::text::{tokens, topic_coverage};

/// Share of an estimated relevance that comes from the source default; the
/// rest comes from topic-token coverage.
const ESTIMATE_PRIOR_SHARE: f64 = 0.5;

/// Weighted sum of log-compressed counters. Missing counters count as zero,
/// and a source with no weight table scores `0.0`.
#[must_use]
pub fn score_engagement(item: &Item, config: &ScoringConfig) -> f64 {
    config
        .weights_for(item.source)
        .into_iter()
        .map(|(counter, weight)| {
            #[allow(clippy::cast_precision_loss)]
            let count = item.engagement.value(counter) as f64;
            weight * count.ln_1p()
        })
        .sum()
}

/// Second log compression of a raw engagement score into `[0, 1]`, so that
/// one viral post does not dominate relevance.
#[must_use]
pub fn engagement_component(raw: f64, config: &ScoringConfig) -> f64 {
    if raw <= 0.0 {
        return 0.0;
    }
    (raw.ln_1p() / config.engagement_reference.ln_1p()).min(1.0)
}

/// Topic relevance for `item`.
///
/// A judge-supplied score is kept as is (clamped). Otherwise the source
/// default is blended with the share of topic tokens found in the item's
/// text, attribution, and enrichment. An empty topic leaves the default.
#[must_use]
pub fn score_relevance(item: &Item, topic: &str, config: &NormalizeConfig) -> f64 {
    if item.relevance_supplied {
        return item.relevance.clamp(0.0, 1.0);
    }
    let prior = config.default_relevance_for(item.source);

    let mut haystack = tokens(&item.title_or_text);
    haystack.extend(tokens(&item.author_or_channel));
    if let Some(enrichment) = &item.enrichment {
        haystack.extend(tokens(enrichment));
    }

    let Some(coverage) = topic_coverage(topic, &haystack) else {
        return prior;
    };
    let estimate = ESTIMATE_PRIOR_SHARE * prior + (1.0 - ESTIMATE_PRIOR_SHARE) * coverage;
    estimate.clamp(0.0, 1.0)
}

/// Multiplicative recency bonus.
///
/// Confidently dated items get `1 + boost * 0.5^(age / half_life)`; low and
/// unknown confidence is exactly neutral. The factor never drops below 1, so
/// an old but well-dated item never ranks under an undated twin.
#[must_use]
pub fn recency_factor(item: &Item, today: NaiveDate, config: &ScoringConfig) -> f64 {
    let Some(published) = item.published_at else {
        return 1.0;
    };
    if !item.date_confidence.is_trusted() {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let age_days = (today - published).num_days().max(0) as f64;
    1.0 + config.recency_boost * 0.5_f64.powf(age_days / config.recency_half_life_days)
}

/// Integer rank score. Relevance is the primary axis; engagement, recency,
/// and source weight adjust it.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn final_score(item: &Item, today: NaiveDate, config: &ScoringConfig) -> i64 {
    let raw = item
        .engagement_score
        .unwrap_or_else(|| score_engagement(item, config));
    let blended = config.relevance_weight * item.relevance
        + config.engagement_weight * engagement_component(raw, config);
    let score = 100.0
        * blended
        * recency_factor(item, today, config)
        * config.source_weight(item.source);
    score.round() as i64
}

/// Set `relevance` and `engagement_score` on every item. `score` is left
/// alone; it belongs to the post-dedupe stage.
pub fn score_items(items: &mut [Item], topic: &str, config: &PipelineConfig) {
    for item in items.iter_mut() {
        item.relevance = score_relevance(item, topic, &config.normalize);
        item.engagement_score = Some(score_engagement(item, &config.scoring));
    }
}
