//! Lookback-window filter applied right after normalization.

use chrono::{Days, NaiveDate};
use topicpulse_core::{Item, NormalizeConfig, Source};

/// Drop items whose trusted date is older than the lookback window.
///
/// Only high and medium confidence dates are checked; unknown and low
/// confidence dates are kept, as are dates after `today` (clock skew between
/// tools). Exempt sources pass through untouched. Returns the kept items and
/// the number dropped.
#[must_use]
pub fn apply_window(
    items: Vec<Item>,
    source: Source,
    today: NaiveDate,
    config: &NormalizeConfig,
) -> (Vec<Item>, usize) {
    if config.date_filter_exempt.contains(&source) {
        return (items, 0);
    }
    let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(config.lookback_days))) else {
        return (items, 0);
    };

    let before = items.len();
    let kept: Vec<Item> = items
        .into_iter()
        .filter(|item| {
            !item.date_confidence.is_trusted() || item.published_at.is_none_or(|d| d >= cutoff)
        })
        .collect();
    let dropped = before - kept.len();

    if dropped > 0 {
        tracing::debug!(
            source = %source,
            dropped,
            cutoff = %cutoff,
            "dropped items outside lookback window"
        );
    }
    (kept, dropped)
}
