use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The fixed set of places content is collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Reddit,
    X,
    YouTube,
    Web,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Reddit, Source::X, Source::YouTube, Source::Web];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::X => "x",
            Source::YouTube => "youtube",
            Source::Web => "web",
        }
    }

    /// Prefix used for positional ids when a record carries none.
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            Source::Reddit => "R",
            Source::X => "X",
            Source::YouTube => "Y",
            Source::Web => "W",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(Source::Reddit),
            "x" | "twitter" => Ok(Source::X),
            "youtube" | "yt" => Ok(Source::YouTube),
            "web" => Ok(Source::Web),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// How far a timestamp can be trusted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DateConfidence {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl DateConfidence {
    /// Parses the loose spellings upstream tools emit (`"med"`, `"HIGH"`, ...).
    #[must_use]
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(DateConfidence::High),
            "med" | "medium" => Some(DateConfidence::Medium),
            "low" => Some(DateConfidence::Low),
            "unknown" | "none" => Some(DateConfidence::Unknown),
            _ => None,
        }
    }

    /// `true` when recency scoring may rely on the date.
    #[must_use]
    pub fn is_trusted(self) -> bool {
        matches!(self, DateConfidence::High | DateConfidence::Medium)
    }
}

/// Raw engagement counters. `None` means the source did not report the
/// counter, which is distinct from a reported zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u64>,
}

/// Names of the counters an [`Engagement`] can carry; used as keys in the
/// engagement weight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    Views,
    Likes,
    Comments,
    Reposts,
    Replies,
    Quotes,
    Upvotes,
}

impl Engagement {
    #[must_use]
    pub fn get(&self, counter: Counter) -> Option<u64> {
        match counter {
            Counter::Views => self.views,
            Counter::Likes => self.likes,
            Counter::Comments => self.comments,
            Counter::Reposts => self.reposts,
            Counter::Replies => self.replies,
            Counter::Quotes => self.quotes,
            Counter::Upvotes => self.upvotes,
        }
    }

    /// Counter value for scoring; absent counters count as zero.
    #[must_use]
    pub fn value(&self, counter: Counter) -> u64 {
        self.get(counter).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Engagement::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SocialKind {
    /// A Reddit discussion thread.
    Thread { subreddit: String },
    /// A short-form X post.
    Post { handle: String },
}

/// Source-specific extension fields. The set is closed: every [`Source`] maps
/// to exactly one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ItemKind {
    Social {
        #[serde(flatten)]
        kind: SocialKind,
    },
    Video {
        video_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u64>,
    },
    Web {
        source_domain: String,
    },
}

impl ItemKind {
    /// Short-text items are compared on their text alone; the rest on
    /// title plus attribution.
    #[must_use]
    pub fn is_short_text(&self) -> bool {
        matches!(self, ItemKind::Social { .. })
    }
}

/// Persistence key: unique across sources after normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub source: Source,
    pub id: String,
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// One piece of content from any source after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub source: Source,
    /// Every source this item stands for. Grows when a cross-source
    /// duplicate is merged into it.
    pub sources: BTreeSet<Source>,
    #[serde(flatten)]
    pub kind: ItemKind,
    pub title_or_text: String,
    pub url: String,
    pub canonical_url: String,
    pub author_or_channel: String,
    pub published_at: Option<NaiveDate>,
    pub date_confidence: DateConfidence,
    pub engagement: Engagement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<String>,
    /// Topic relevance in `[0, 1]`.
    pub relevance: f64,
    /// Whether `relevance` came from an upstream judge rather than a default.
    pub relevance_supplied: bool,
    pub engagement_score: Option<f64>,
    /// Final rank score. Only set once deduplication has run.
    pub score: Option<i64>,
    pub why_relevant: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<ItemKey>,
}

impl Item {
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey {
            source: self.source,
            id: self.id.clone(),
        }
    }

    /// Stable storage fingerprint derived from the canonical URL, suitable
    /// for matching against items stored by earlier runs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(self.canonical_url.as_bytes()))
    }

    /// Engagement score used for ordering; unscored items sort as zero.
    #[must_use]
    pub fn engagement_or_zero(&self) -> f64 {
        self.engagement_score.unwrap_or(0.0)
    }
}
