use serde::Deserialize;
use serde_json::Value;
use topicpulse_core::{Engagement, ItemKind, NormalizeConfig, SocialKind, Source};

use super::{
    id_from_value, lenient_count, non_empty, parse_date_str, parse_record, DateOrigin, Draft,
    Mapped, RecordDefect,
};

/// Covers both the CLI tweet shape (camelCase counters, nested author) and
/// the search shape (nested engagement, flat handle).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    #[serde(default, alias = "id_str")]
    id: Option<Value>,
    #[serde(default, alias = "full_text")]
    text: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    author: Option<RawAuthor>,
    #[serde(default, rename = "author_handle")]
    author_handle: Option<String>,
    #[serde(default, alias = "created_at")]
    created_at: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, rename = "date_confidence")]
    date_confidence: Option<String>,
    #[serde(default)]
    engagement: Option<RawPostEngagement>,
    #[serde(default, alias = "favorite_count", deserialize_with = "lenient_count")]
    like_count: Option<u64>,
    #[serde(default, alias = "retweet_count", deserialize_with = "lenient_count")]
    retweet_count: Option<u64>,
    #[serde(default, alias = "reply_count", deserialize_with = "lenient_count")]
    reply_count: Option<u64>,
    #[serde(default, alias = "quote_count", deserialize_with = "lenient_count")]
    quote_count: Option<u64>,
    #[serde(default)]
    relevance: Option<f64>,
    #[serde(default, rename = "why_relevant")]
    why_relevant: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default, alias = "screen_name", alias = "handle")]
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPostEngagement {
    #[serde(default, deserialize_with = "lenient_count")]
    likes: Option<u64>,
    #[serde(default, alias = "retweets", deserialize_with = "lenient_count")]
    reposts: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    replies: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    quotes: Option<u64>,
}

fn clean_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

pub(super) fn normalize_post(
    raw: &Value,
    position: usize,
    config: &NormalizeConfig,
) -> Result<Mapped, RecordDefect> {
    let post: RawPost = parse_record(raw)?;

    let handle = non_empty(post.author_handle)
        .or_else(|| post.author.and_then(|a| non_empty(a.username)))
        .map(|h| clean_handle(&h))
        .unwrap_or_default();

    let native_id = id_from_value(post.id.as_ref());

    // Without a link the post can only be addressed by handle and status id.
    let url = match (non_empty(post.url), &native_id) {
        (Some(url), _) => url,
        (None, Some(id)) if !handle.is_empty() => format!("https://x.com/{handle}/status/{id}"),
        (None, _) => String::new(),
    };

    let date = post
        .created_at
        .as_deref()
        .and_then(parse_date_str)
        .map(|d| (d, DateOrigin::Timestamp))
        .or_else(|| {
            post.date
                .as_deref()
                .and_then(parse_date_str)
                .map(|d| (d, DateOrigin::DateString))
        });

    let nested = post.engagement;
    let has_nested = nested.is_some();
    let nested = nested.unwrap_or_default();
    let engagement = if has_nested {
        Engagement {
            likes: nested.likes,
            reposts: nested.reposts,
            replies: nested.replies,
            quotes: nested.quotes,
            ..Engagement::default()
        }
    } else {
        Engagement {
            likes: post.like_count,
            reposts: post.retweet_count,
            replies: post.reply_count,
            quotes: post.quote_count,
            ..Engagement::default()
        }
    };

    Draft {
        source: Source::X,
        id: native_id,
        position,
        kind: ItemKind::Social {
            kind: SocialKind::Post {
                handle: handle.clone(),
            },
        },
        title_or_text: post.text,
        url,
        author_or_channel: handle,
        date,
        date_confidence: post.date_confidence,
        engagement,
        enrichment: None,
        relevance: post.relevance,
        why_relevant: post.why_relevant,
    }
    .finish(config)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use topicpulse_core::DateConfidence;

    use super::*;

    #[test]
    fn maps_cli_tweet_shape() {
        let raw = json!({
            "id": "1890001",
            "text": "shipping the new release today",
            "author": {"username": "ferris", "name": "Ferris"},
            "createdAt": "Tue Feb 10 18:30:00 +0000 2026",
            "likeCount": 120,
            "retweetCount": 14,
            "replyCount": 9,
            "quoteCount": 2
        });
        let item = normalize_post(&raw, 1, &NormalizeConfig::default()).unwrap().item;
        assert_eq!(item.id, "1890001");
        assert_eq!(item.url, "https://x.com/ferris/status/1890001");
        assert_eq!(item.author_or_channel, "ferris");
        assert_eq!(item.engagement.likes, Some(120));
        assert_eq!(item.engagement.reposts, Some(14));
        assert_eq!(item.engagement.replies, Some(9));
        assert_eq!(item.engagement.quotes, Some(2));
        assert_eq!(item.published_at, NaiveDate::from_ymd_opt(2026, 2, 10));
        assert_eq!(item.date_confidence, DateConfidence::High);
        assert!(!item.relevance_supplied);
    }

    #[test]
    fn maps_search_shape() {
        let raw = json!({
            "text": "hot take on async traits",
            "url": "https://twitter.com/someone/status/55?s=20",
            "author_handle": "@someone",
            "date": "2026-02-01",
            "date_confidence": "med",
            "engagement": {"likes": 40, "reposts": 3},
            "relevance": 0.8,
            "why_relevant": "discusses topic"
        });
        let item = normalize_post(&raw, 4, &NormalizeConfig::default()).unwrap().item;
        assert_eq!(item.id, "X4");
        assert_eq!(item.author_or_channel, "someone");
        assert_eq!(item.canonical_url, "https://x.com/someone/status/55");
        assert_eq!(item.engagement.likes, Some(40));
        assert_eq!(item.engagement.replies, None);
        assert_eq!(item.date_confidence, DateConfidence::Medium);
        assert!((item.relevance - 0.8).abs() < f64::EPSILON);
        assert_eq!(item.why_relevant, "discusses topic");
    }

    #[test]
    fn no_url_and_no_id_is_missing_url() {
        let raw = json!({"text": "orphan", "author_handle": "a"});
        assert_eq!(
            normalize_post(&raw, 1, &NormalizeConfig::default()).unwrap_err(),
            RecordDefect::MissingUrl
        );
    }
}
