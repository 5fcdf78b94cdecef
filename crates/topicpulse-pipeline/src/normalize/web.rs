use serde::Deserialize;
use serde_json::Value;
use topicpulse_core::{Engagement, ItemKind, NormalizeConfig, Source};

use super::{
    id_from_value, non_empty, parse_date_str, parse_record, DateOrigin, Draft, Mapped,
    RecordDefect,
};
use crate::url::domain_of;

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "link")]
    url: String,
    #[serde(default, alias = "description")]
    snippet: Option<String>,
    #[serde(default, alias = "domain")]
    source_domain: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, alias = "published_date")]
    date: Option<String>,
    #[serde(default)]
    date_confidence: Option<String>,
    #[serde(default)]
    relevance: Option<f64>,
    #[serde(default)]
    why_relevant: Option<String>,
}

pub(super) fn normalize_page(
    raw: &Value,
    position: usize,
    config: &NormalizeConfig,
) -> Result<Mapped, RecordDefect> {
    let page: RawPage = parse_record(raw)?;

    let domain = non_empty(page.source_domain)
        .map(|d| d.trim_start_matches("www.").to_ascii_lowercase())
        .or_else(|| domain_of(&page.url))
        .unwrap_or_default();

    let snippet = non_empty(page.snippet);
    // Snippet-only results still carry something to rank on.
    let title_or_text = non_empty(Some(page.title))
        .or_else(|| snippet.clone())
        .unwrap_or_default();

    Draft {
        source: Source::Web,
        id: id_from_value(page.id.as_ref()),
        position,
        kind: ItemKind::Web {
            source_domain: domain.clone(),
        },
        title_or_text,
        url: page.url,
        // Attribution falls back to the publishing domain.
        author_or_channel: non_empty(page.author).unwrap_or(domain),
        date: page
            .date
            .as_deref()
            .and_then(parse_date_str)
            .map(|d| (d, DateOrigin::DateString)),
        date_confidence: page.date_confidence,
        engagement: Engagement::default(),
        enrichment: snippet,
        relevance: page.relevance,
        why_relevant: page.why_relevant,
    }
    .finish(config)
}
