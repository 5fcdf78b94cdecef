use serde::Deserialize;
use serde_json::Value;
use topicpulse_core::{Engagement, ItemKind, NormalizeConfig, Source};

use super::{
    count_from_value, id_from_value, lenient_count, non_empty, parse_date_str, parse_record,
    positional_id, DateOrigin, Draft, Mapped, RecordDefect,
};
use crate::url::youtube_video_id;

/// Processed search results and raw extractor JSON lines both land here;
/// the extractor spells its fields differently.
#[derive(Debug, Deserialize)]
struct RawVideo {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "webpage_url")]
    url: Option<String>,
    #[serde(default)]
    channel_name: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    date_confidence: Option<String>,
    #[serde(default)]
    engagement: Option<RawVideoEngagement>,
    #[serde(default, deserialize_with = "lenient_count")]
    view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    like_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    comment_count: Option<u64>,
    #[serde(default)]
    duration: Option<Value>,
    #[serde(default, alias = "transcript")]
    transcript_snippet: Option<String>,
    #[serde(default)]
    relevance: Option<f64>,
    #[serde(default)]
    why_relevant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVideoEngagement {
    #[serde(default, deserialize_with = "lenient_count")]
    views: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    likes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    comments: Option<u64>,
}

pub(super) fn normalize_video(
    raw: &Value,
    position: usize,
    config: &NormalizeConfig,
) -> Result<Mapped, RecordDefect> {
    let video: RawVideo = parse_record(raw)?;

    let url_id = video.url.as_deref().and_then(youtube_video_id);
    let video_id = non_empty(video.video_id)
        .or_else(|| id_from_value(video.id.as_ref()))
        .or(url_id);

    let url = match (non_empty(video.url), &video_id) {
        (Some(url), _) => url,
        (None, Some(id)) => format!("https://www.youtube.com/watch?v={id}"),
        (None, None) => String::new(),
    };

    // upload_date is the extractor's own YYYYMMDD field.
    let date = video
        .upload_date
        .as_deref()
        .and_then(parse_date_str)
        .map(|d| (d, DateOrigin::Timestamp))
        .or_else(|| {
            video
                .date
                .as_deref()
                .and_then(parse_date_str)
                .map(|d| (d, DateOrigin::DateString))
        });

    let engagement = match video.engagement {
        Some(e) => Engagement {
            views: e.views,
            likes: e.likes,
            comments: e.comments,
            ..Engagement::default()
        },
        None => Engagement {
            views: video.view_count,
            likes: video.like_count,
            comments: video.comment_count,
            ..Engagement::default()
        },
    };

    let channel = non_empty(video.channel_name)
        .or_else(|| non_empty(video.channel))
        .or_else(|| non_empty(video.uploader))
        .unwrap_or_default();

    Draft {
        source: Source::YouTube,
        kind: ItemKind::Video {
            video_id: video_id
                .clone()
                .unwrap_or_else(|| positional_id(Source::YouTube, position)),
            duration_secs: video.duration.as_ref().and_then(count_from_value),
        },
        id: video_id,
        position,
        title_or_text: video.title,
        url,
        author_or_channel: channel,
        date,
        date_confidence: video.date_confidence,
        engagement,
        enrichment: video
            .transcript_snippet
            .map(|t| crate::text::collapse_whitespace(&t)),
        relevance: video.relevance,
        why_relevant: video.why_relevant,
    }
    .finish(config)
}
