//! Tuning knobs for the normalize → score → dedupe → aggregate pipeline.
//!
//! Every threshold and weight is domain-tuned rather than derived, so all of
//! them live here with defaults instead of in the stages. A YAML file only
//! needs to name the values it overrides; per-source tables overlay the
//! defaults entry by entry.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::item::{Counter, Source};
use crate::ConfigError;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalize: NormalizeConfig,
    pub scoring: ScoringConfig,
    pub dedupe: DedupeConfig,
    pub aggregate: AggregateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Word budget for transcripts and comment excerpts.
    pub transcript_max_words: usize,
    /// Relevance assigned when a record carries no judge score.
    #[serde(deserialize_with = "de_default_relevance")]
    pub default_relevance: BTreeMap<Source, f64>,
    /// Trusted dates older than this many days are dropped.
    pub lookback_days: u32,
    /// Sources exempt from the lookback window.
    pub date_filter_exempt: Vec<Source>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            transcript_max_words: 500,
            default_relevance: default_relevance(),
            lookback_days: 30,
            date_filter_exempt: vec![Source::YouTube],
        }
    }
}

impl NormalizeConfig {
    #[must_use]
    pub fn default_relevance_for(&self, source: Source) -> f64 {
        self.default_relevance.get(&source).copied().unwrap_or(0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Per-source weights over log-compressed counters. Each table sums to 1.
    #[serde(deserialize_with = "de_engagement_weights")]
    pub engagement_weights: BTreeMap<Source, BTreeMap<Counter, f64>>,
    /// Raw engagement score that maps to a full engagement component.
    pub engagement_reference: f64,
    pub relevance_weight: f64,
    pub engagement_weight: f64,
    /// Largest multiplicative bonus a brand-new, confidently dated item gets.
    pub recency_boost: f64,
    pub recency_half_life_days: f64,
    #[serde(deserialize_with = "de_source_weights")]
    pub source_weights: BTreeMap<Source, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            engagement_weights: default_engagement_weights(),
            engagement_reference: 15.0,
            relevance_weight: 0.75,
            engagement_weight: 0.25,
            recency_boost: 0.15,
            recency_half_life_days: 7.0,
            source_weights: default_source_weights(),
        }
    }
}

impl ScoringConfig {
    /// Counter weights for `source`; an empty slice means the source has no
    /// engagement signal.
    #[must_use]
    pub fn weights_for(&self, source: Source) -> Vec<(Counter, f64)> {
        self.engagement_weights
            .get(&source)
            .map(|table| table.iter().map(|(c, w)| (*c, *w)).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn source_weight(&self, source: Source) -> f64 {
        self.source_weights.get(&source).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Token-set Jaccard at or above which two short posts merge.
    pub social_jaccard_threshold: f64,
    /// Title Jaccard required for video/web items.
    pub title_jaccard_threshold: f64,
    /// Channel/author Jaccard required alongside the title threshold.
    pub attribution_jaccard_threshold: f64,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            social_jaccard_threshold: 0.7,
            title_jaccard_threshold: 0.6,
            attribution_jaccard_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub min_relevance: f64,
    /// Floors tried in order while the report is under-filled.
    pub relaxed_relevance_floors: Vec<f64>,
    pub min_items: usize,
    /// Items a contributing source keeps even if the floor removed all of them.
    pub min_per_source: usize,
    pub max_items: Option<usize>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            min_relevance: 0.3,
            relaxed_relevance_floors: vec![0.15, 0.0],
            min_items: 5,
            min_per_source: 3,
            max_items: None,
        }
    }
}

fn default_relevance() -> BTreeMap<Source, f64> {
    BTreeMap::from([
        (Source::Reddit, 0.5),
        (Source::X, 0.5),
        (Source::YouTube, 0.7),
        (Source::Web, 0.5),
    ])
}

fn default_engagement_weights() -> BTreeMap<Source, BTreeMap<Counter, f64>> {
    BTreeMap::from([
        (
            Source::Reddit,
            BTreeMap::from([(Counter::Upvotes, 0.55), (Counter::Comments, 0.45)]),
        ),
        (
            Source::X,
            BTreeMap::from([
                (Counter::Likes, 0.55),
                (Counter::Reposts, 0.25),
                (Counter::Replies, 0.15),
                (Counter::Quotes, 0.05),
            ]),
        ),
        (
            Source::YouTube,
            BTreeMap::from([
                (Counter::Views, 0.50),
                (Counter::Likes, 0.35),
                (Counter::Comments, 0.15),
            ]),
        ),
        (Source::Web, BTreeMap::new()),
    ])
}

fn default_source_weights() -> BTreeMap<Source, f64> {
    BTreeMap::from([
        (Source::Reddit, 1.0),
        (Source::X, 1.0),
        (Source::YouTube, 1.0),
        (Source::Web, 0.85),
    ])
}

fn overlay<'de, D, T>(
    deserializer: D,
    defaults: BTreeMap<Source, T>,
) -> Result<BTreeMap<Source, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let provided = BTreeMap::<Source, T>::deserialize(deserializer)?;
    let mut merged = defaults;
    merged.extend(provided);
    Ok(merged)
}

fn de_default_relevance<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Source, f64>, D::Error> {
    overlay(deserializer, default_relevance())
}

fn de_engagement_weights<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Source, BTreeMap<Counter, f64>>, D::Error> {
    overlay(deserializer, default_engagement_weights())
}

fn de_source_weights<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Source, f64>, D::Error> {
    overlay(deserializer, default_source_weights())
}

/// Load and validate the pipeline configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PipelineFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_pipeline_config(&content)
}

/// Parse and validate pipeline configuration from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_pipeline_config(yaml: &str) -> Result<PipelineConfig, ConfigError> {
    // An empty document deserializes to unit, not to an empty mapping.
    if yaml.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    let config: PipelineConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

impl PipelineConfig {
    /// Check ranges and weight sums.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.normalize;
        if n.transcript_max_words == 0 {
            return invalid("normalize.transcript_max_words must be at least 1");
        }
        if n.lookback_days == 0 {
            return invalid("normalize.lookback_days must be at least 1");
        }
        for (source, value) in &n.default_relevance {
            unit_interval(&format!("normalize.default_relevance.{source}"), *value)?;
        }

        let s = &self.scoring;
        for (source, table) in &s.engagement_weights {
            if table.is_empty() {
                continue;
            }
            for (counter, w) in table {
                non_negative(
                    &format!("scoring.engagement_weights.{source}.{counter:?}"),
                    *w,
                )?;
            }
            let sum: f64 = table.values().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return invalid(&format!(
                    "scoring.engagement_weights.{source} must sum to 1 (got {sum})"
                ));
            }
        }
        positive("scoring.engagement_reference", s.engagement_reference)?;
        positive("scoring.recency_half_life_days", s.recency_half_life_days)?;
        non_negative("scoring.recency_boost", s.recency_boost)?;
        non_negative("scoring.relevance_weight", s.relevance_weight)?;
        non_negative("scoring.engagement_weight", s.engagement_weight)?;
        if s.relevance_weight + s.engagement_weight <= 0.0 {
            return invalid("scoring.relevance_weight + scoring.engagement_weight must be > 0");
        }
        for (source, w) in &s.source_weights {
            non_negative(&format!("scoring.source_weights.{source}"), *w)?;
        }

        let d = &self.dedupe;
        unit_interval("dedupe.social_jaccard_threshold", d.social_jaccard_threshold)?;
        unit_interval("dedupe.title_jaccard_threshold", d.title_jaccard_threshold)?;
        unit_interval(
            "dedupe.attribution_jaccard_threshold",
            d.attribution_jaccard_threshold,
        )?;

        let a = &self.aggregate;
        unit_interval("aggregate.min_relevance", a.min_relevance)?;
        let mut previous = a.min_relevance;
        for floor in &a.relaxed_relevance_floors {
            unit_interval("aggregate.relaxed_relevance_floors", *floor)?;
            if *floor >= previous {
                return invalid(
                    "aggregate.relaxed_relevance_floors must be strictly decreasing and below min_relevance",
                );
            }
            previous = *floor;
        }
        if a.max_items.is_some_and(|max| max < a.min_items.max(1)) {
            return invalid("aggregate.max_items must be at least aggregate.min_items");
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(message.to_string()))
}

fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        invalid(&format!("{field} must be within [0, 1] (got {value})"))
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        invalid(&format!("{field} must be positive (got {value})"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        invalid(&format!("{field} must be finite and not negative (got {value})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn default_weight_tables_sum_to_one() {
        let cfg = ScoringConfig::default();
        for source in [Source::Reddit, Source::X, Source::YouTube] {
            let sum: f64 = cfg.weights_for(source).iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{source} weights sum to {sum}");
        }
        assert!(cfg.weights_for(Source::Web).is_empty());
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse_pipeline_config("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
dedupe:
  social_jaccard_threshold: 0.8
aggregate:
  min_items: 10
";
        let cfg = parse_pipeline_config(yaml).unwrap();
        assert!((cfg.dedupe.social_jaccard_threshold - 0.8).abs() < f64::EPSILON);
        assert!((cfg.dedupe.title_jaccard_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.aggregate.min_items, 10);
        assert_eq!(cfg.aggregate.min_per_source, 3);
        assert_eq!(cfg.normalize.transcript_max_words, 500);
    }

    #[test]
    fn per_source_tables_overlay_defaults() {
        let yaml = r"
scoring:
  source_weights:
    web: 0.5
  engagement_weights:
    x:
      likes: 0.7
      reposts: 0.3
";
        let cfg = parse_pipeline_config(yaml).unwrap();
        assert!((cfg.scoring.source_weight(Source::Web) - 0.5).abs() < f64::EPSILON);
        assert!((cfg.scoring.source_weight(Source::Reddit) - 1.0).abs() < f64::EPSILON);
        assert_eq!(cfg.scoring.weights_for(Source::X).len(), 2);
        assert_eq!(cfg.scoring.weights_for(Source::YouTube).len(), 3);
    }

    #[test]
    fn weights_not_summing_to_one_are_rejected() {
        let yaml = r"
scoring:
  engagement_weights:
    reddit:
      upvotes: 0.5
      comments: 0.2
";
        let err = parse_pipeline_config(yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref m) if m.contains("reddit")),
            "got {err:?}"
        );
    }

    #[test]
    fn nan_engagement_weight_is_rejected() {
        let yaml = r"
scoring:
  engagement_weights:
    youtube:
      views: .nan
      likes: 0.5
      comments: 0.5
";
        let err = parse_pipeline_config(yaml).unwrap_err();
        assert!(
            matches!(
                err,
                ConfigError::Validation(ref m) if m.contains("youtube") && m.contains("NaN")
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn negative_engagement_weight_is_rejected() {
        let yaml = r"
scoring:
  engagement_weights:
    x:
      likes: 1.2
      reposts: -0.2
";
        let err = parse_pipeline_config(yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref m) if m.contains("x.Reposts")),
            "got {err:?}"
        );
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let yaml = "dedupe:\n  title_jaccard_threshold: 1.5\n";
        let err = parse_pipeline_config(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("title_jaccard")));
    }

    #[test]
    fn relaxed_floors_must_descend_below_min_relevance() {
        let yaml = "aggregate:\n  min_relevance: 0.3\n  relaxed_relevance_floors: [0.4]\n";
        assert!(matches!(
            parse_pipeline_config(yaml),
            Err(ConfigError::Validation(_))
        ));

        let yaml = "aggregate:\n  relaxed_relevance_floors: [0.1, 0.2]\n";
        assert!(matches!(
            parse_pipeline_config(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn cap_below_minimum_fill_is_rejected() {
        let yaml = "aggregate:\n  min_items: 5\n  max_items: 3\n";
        assert!(matches!(
            parse_pipeline_config(yaml),
            Err(ConfigError::Validation(ref m)) if m.contains("max_items")
        ));
        let yaml = "aggregate:\n  min_items: 5\n  max_items: 20\n";
        assert_eq!(parse_pipeline_config(yaml).unwrap().aggregate.max_items, Some(20));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_pipeline_config("dedupe: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::PipelineFileParse(_)));
    }

    #[test]
    fn unknown_source_key_is_a_parse_error() {
        let err = parse_pipeline_config("scoring:\n  source_weights:\n    myspace: 1.0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::PipelineFileParse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_pipeline_config(Path::new("/nonexistent/topicpulse.yaml")).unwrap_err();
        assert!(
            matches!(err, ConfigError::PipelineFileIo { ref path, .. } if path.contains("topicpulse.yaml"))
        );
    }
}
