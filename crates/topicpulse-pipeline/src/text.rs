//! Token-set similarity used by deduplication and relevance estimation.

use std::collections::HashSet;

/// Words that carry no topical signal when measuring topic coverage.
const TOPIC_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "by", "for", "from", "how", "in", "is", "of", "on", "or",
    "the", "to", "vs", "what", "with",
];

/// Lower-cases `text`, treats every non-alphanumeric character as a
/// separator, and returns the set of remaining tokens.
#[must_use]
pub fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two token sets. Two empty sets score `0.0`, so
/// empty text never counts as a duplicate of other empty text.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Fraction of the topic's content tokens that appear in `haystack`.
/// Returns `None` when the topic has no content tokens.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn topic_coverage(topic: &str, haystack: &HashSet<String>) -> Option<f64> {
    let wanted: Vec<String> = tokens(topic)
        .into_iter()
        .filter(|t| !TOPIC_STOPWORDS.contains(&t.as_str()))
        .collect();
    if wanted.is_empty() {
        return None;
    }
    let hits = wanted.iter().filter(|t| haystack.contains(*t)).count();
    Some(hits as f64 / wanted.len() as f64)
}

/// Collapses runs of whitespace into single spaces and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first `max_words` words of `text`, appending `...` when
/// anything was cut.
#[must_use]
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut out = words[..max_words].join(" ");
    out.push_str("...");
    out
}
