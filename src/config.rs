//! Conversion configuration.
//!
//! Every threshold the pipeline uses lives here. A [`Config`] is built once,
//! validated, and handed by reference to each component at construction.
//! All sections implement `Default` and are `#[serde(default)]`, so a JSON
//! file only needs the keys it wants to change:
//!
//! ```json
//! {
//!   "analyzer": { "h1_ratio": 1.8, "heading_color": "#1F4E79" },
//!   "vocabulary": { "key_terms": ["Threat Model", "OWASP"] }
//! }
//! ```

use crate::error::{Error, Result};
use crate::layout::DEFAULT_LIST_MARKER_PATTERN;
use crate::model::Rgb;
use crate::render::RenderOptions;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub segmenter: SegmenterConfig,
    pub render: RenderOptions,
    pub vocabulary: Vocabulary,
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        self.segmenter.validate()?;
        self.render.validate()?;
        self.vocabulary.validate()
    }
}

/// Thresholds for classifying text runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// A run at least this many times the body size is a level-1 heading
    pub h1_ratio: f32,
    /// A run at least this many times the body size is a level-2 heading
    pub h2_ratio: f32,
    /// Runs drawn in exactly this colour are level-1 headings
    pub heading_color: Option<Rgb>,
    /// Font names matching this pattern are monospace
    pub monospace_pattern: String,
    /// Treat bold runs at body size as level-2 headings
    pub bold_as_heading: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            h1_ratio: 1.5,
            h2_ratio: 1.2,
            heading_color: None,
            monospace_pattern: r"(?i)courier|consolas|mono|menlo|inconsolata".to_string(),
            bold_as_heading: false,
        }
    }
}

impl AnalyzerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.h1_ratio > 0.0 && self.h2_ratio > 0.0) {
            return Err(Error::Config(
                "heading ratios must be greater than zero".to_string(),
            ));
        }
        if self.h2_ratio > self.h1_ratio {
            return Err(Error::Config(format!(
                "h2_ratio ({}) must not exceed h1_ratio ({})",
                self.h2_ratio, self.h1_ratio
            )));
        }
        Regex::new(&self.monospace_pattern)?;
        Ok(())
    }
}

/// Tolerances for grouping runs into lines and blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Runs whose baselines differ by less than this fraction of the font
    /// size share a line
    pub baseline_tolerance: f32,
    /// Lines further apart than this multiple of the font size start a new
    /// block
    pub line_spacing: f32,
    /// Horizontal distance in points that equals one list nesting level
    pub indent_unit: f32,
    /// Deepest list nesting level
    pub max_depth: u8,
    /// Smallest horizontal gap in points that separates two table cells
    pub min_column_gap: f32,
    /// Cell left edges within this distance in points share a column
    pub column_tolerance: f32,
    /// Fewest consecutive columnar lines that form a table
    pub min_table_rows: usize,
    /// Regex for a list marker at the start of a line; a `number` capture
    /// makes the item numbered
    pub list_marker_pattern: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            baseline_tolerance: 0.3,
            line_spacing: 1.6,
            indent_unit: 20.0,
            max_depth: 4,
            min_column_gap: 15.0,
            column_tolerance: 5.0,
            min_table_rows: 2,
            list_marker_pattern: DEFAULT_LIST_MARKER_PATTERN.to_string(),
        }
    }
}

impl SegmenterConfig {
    fn validate(&self) -> Result<()> {
        if !(self.indent_unit > 0.0) {
            return Err(Error::Config("indent_unit must be greater than zero".into()));
        }
        if !(self.line_spacing > 0.0 && self.baseline_tolerance >= 0.0) {
            return Err(Error::Config(
                "line_spacing must be positive and baseline_tolerance non-negative".into(),
            ));
        }
        if !(self.min_column_gap > 0.0 && self.column_tolerance >= 0.0) {
            return Err(Error::Config(
                "min_column_gap must be positive and column_tolerance non-negative".into(),
            ));
        }
        if self.min_table_rows < 2 {
            return Err(Error::Config("min_table_rows must be at least 2".into()));
        }
        Regex::new(&self.list_marker_pattern)?;
        Ok(())
    }
}

/// Key terms and tag rules applied to the rendered note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Phrases wrapped in `[[...]]` on first occurrence
    pub key_terms: Vec<String>,
    /// Keyword rules that append `#tag` tokens
    pub tags: Vec<TagRule>,
    /// Discover additional key terms from word frequency
    pub auto_terms: Option<AutoTerms>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let rule = |tag: &str, keywords: &[&str]| TagRule {
            tag: tag.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        };
        Self {
            key_terms: Vec::new(),
            tags: vec![
                rule("security", &["security"]),
                rule("assessment", &["assessment"]),
                rule("compliance", &["compliance"]),
                rule("network", &["network"]),
                rule("vulnerability", &["vulnerability"]),
                rule("methodology", &["methodology", "methods"]),
            ],
            auto_terms: None,
        }
    }
}

impl Vocabulary {
    /// An empty vocabulary: no links, no tags.
    pub fn empty() -> Self {
        Self {
            key_terms: Vec::new(),
            tags: Vec::new(),
            auto_terms: None,
        }
    }

    pub fn with_key_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_terms.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn with_tag<I, S>(mut self, tag: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(TagRule {
            tag: tag.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_auto_terms(mut self, auto: AutoTerms) -> Self {
        self.auto_terms = Some(auto);
        self
    }

    fn validate(&self) -> Result<()> {
        for rule in &self.tags {
            let tag = rule.tag.trim_start_matches('#');
            if tag.is_empty() || tag.chars().any(char::is_whitespace) {
                return Err(Error::Config(format!("invalid tag name '{}'", rule.tag)));
            }
        }
        Ok(())
    }
}

/// A tag added when any of its keywords occurs in the note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    /// Tag name, with or without the leading `#`
    pub tag: String,
    pub keywords: Vec<String>,
}

/// Frequency-based key term discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTerms {
    pub min_frequency: usize,
    pub min_word_len: usize,
    pub stopwords: Vec<String>,
}

impl Default for AutoTerms {
    fn default() -> Self {
        Self {
            min_frequency: 2,
            min_word_len: 4,
            stopwords: [
                "the", "and", "or", "of", "to", "a", "in", "is", "for", "on", "with", "this",
                "that", "by", "are",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json_str(
            r##"{ "analyzer": { "h1_ratio": 2.0, "heading_color": "#336699" } }"##,
        )
        .unwrap();
        assert_eq!(config.analyzer.h1_ratio, 2.0);
        assert_eq!(config.analyzer.h2_ratio, 1.2);
        assert_eq!(config.analyzer.heading_color, Some(Rgb(0x33, 0x66, 0x99)));
        assert_eq!(config.segmenter.max_depth, 4);
        assert_eq!(
            config.segmenter.list_marker_pattern,
            DEFAULT_LIST_MARKER_PATTERN
        );
        assert_eq!(config.vocabulary.tags.len(), 6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_json_str(r#"{ "analyzer": { "h1_ratio": 0 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "analyzer": { "monospace_pattern": "(" } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "segmenter": { "indent_unit": 0 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "segmenter": { "list_marker_pattern": "[" } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "vocabulary": { "tags": [{ "tag": "two words", "keywords": [] }] } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str("not json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_vocabulary_builder() {
        let vocab = Vocabulary::empty()
            .with_key_terms(["OWASP"])
            .with_tag("web", ["http", "browser"]);
        assert_eq!(vocab.key_terms, vec!["OWASP"]);
        assert_eq!(vocab.tags[0].keywords.len(), 2);
        assert!(vocab.auto_terms.is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_json_file("/nonexistent/pdfnote.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
