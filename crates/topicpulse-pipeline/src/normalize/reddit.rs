use serde::Deserialize;
use serde_json::Value;
use topicpulse_core::{Engagement, ItemKind, NormalizeConfig, SocialKind, Source};

use super::{
    date_from_unix, id_from_value, lenient_count, non_empty, parse_date_str, parse_record,
    DateOrigin, Draft, Mapped, RecordDefect,
};

#[derive(Debug, Deserialize)]
struct RawThread {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "permalink")]
    url: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    date_confidence: Option<String>,
    #[serde(default)]
    engagement: Option<RawThreadEngagement>,
    #[serde(default)]
    top_comments: Vec<RawComment>,
    #[serde(default)]
    relevance: Option<f64>,
    #[serde(default)]
    why_relevant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawThreadEngagement {
    #[serde(default, alias = "score", deserialize_with = "lenient_count")]
    upvotes: Option<u64>,
    #[serde(default, alias = "num_comments", deserialize_with = "lenient_count")]
    comments: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    author: Option<String>,
    #[serde(default, alias = "body", alias = "text")]
    excerpt: String,
}

fn strip_subreddit_prefix(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("/r/")
        .or_else(|| trimmed.strip_prefix("r/"))
        .unwrap_or(trimmed)
        .to_string()
}

/// Joins top-comment excerpts into one enrichment string.
fn comment_digest(comments: &[RawComment]) -> Option<String> {
    let parts: Vec<String> = comments
        .iter()
        .filter(|c| !c.excerpt.trim().is_empty())
        .map(|c| match non_empty(c.author.clone()) {
            Some(author) => format!("{author}: {}", c.excerpt.trim()),
            None => c.excerpt.trim().to_string(),
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(" | "))
}

pub(super) fn normalize_thread(
    raw: &Value,
    position: usize,
    config: &NormalizeConfig,
) -> Result<Mapped, RecordDefect> {
    let thread: RawThread = parse_record(raw)?;

    // A structured timestamp beats a date string when both are present.
    let date = thread
        .created_utc
        .and_then(date_from_unix)
        .map(|d| (d, DateOrigin::Timestamp))
        .or_else(|| {
            thread
                .date
                .as_deref()
                .and_then(parse_date_str)
                .map(|d| (d, DateOrigin::DateString))
        });

    let engagement = thread.engagement.unwrap_or_default();
    let subreddit = strip_subreddit_prefix(&thread.subreddit);

    Draft {
        source: Source::Reddit,
        id: id_from_value(thread.id.as_ref()),
        position,
        kind: ItemKind::Social {
            kind: SocialKind::Thread {
                subreddit: subreddit.clone(),
            },
        },
        title_or_text: thread.title,
        url: thread.url,
        author_or_channel: non_empty(thread.author).unwrap_or_else(|| {
            if subreddit.is_empty() {
                String::new()
            } else {
                format!("r/{subreddit}")
            }
        }),
        date,
        date_confidence: thread.date_confidence,
        engagement: Engagement {
            upvotes: engagement.upvotes,
            comments: engagement.comments,
            ..Engagement::default()
        },
        enrichment: comment_digest(&thread.top_comments),
        relevance: thread.relevance,
        why_relevant: thread.why_relevant,
    }
    .finish(config)
}
