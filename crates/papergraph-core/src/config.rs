//! Pipeline configuration
//!
//! Handles configuration from TOML files and environment variables with
//! defaults tuned for scientific-paper extraction. Every stage reads its
//! knobs from here; nothing is a process-wide singleton.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: SectionFilterConfig,
    pub segmenter: SegmenterConfig,
    pub extractor: ExtractorConfig,
    pub relations: RelationConfig,
    pub reducer: ReducerConfig,
    /// Parallel document workers in batch mode
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: SectionFilterConfig::default(),
            segmenter: SegmenterConfig::default(),
            extractor: ExtractorConfig::default(),
            relations: RelationConfig::default(),
            reducer: ReducerConfig::default(),
            workers: 4,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.into())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment-variable overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("PAPERGRAPH_WORKERS") {
            self.workers = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PAPERGRAPH_WORKERS".to_string(),
                value: v,
            })?;
        }
        if let Ok(v) = std::env::var("PAPERGRAPH_OVERVIEW_BUDGET") {
            self.reducer.overview_budget = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PAPERGRAPH_OVERVIEW_BUDGET".to_string(),
                value: v,
            })?;
        }
        if let Ok(v) = std::env::var("PAPERGRAPH_SECTION_BUDGET") {
            self.reducer.section_budget = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PAPERGRAPH_SECTION_BUDGET".to_string(),
                value: v,
            })?;
        }
        Ok(())
    }
}

/// Stage 1: section filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionFilterConfig {
    /// Sections with fewer words are dropped
    pub min_words: usize,
    /// Non-content headings, matched case-insensitively after normalization
    pub skip_headings: Vec<String>,
}

impl Default for SectionFilterConfig {
    fn default() -> Self {
        Self {
            min_words: 15,
            skip_headings: [
                "REFERENCES",
                "BIBLIOGRAPHY",
                "ACKNOWLEDGEMENTS",
                "ACKNOWLEDGMENTS",
                "FUNDING",
                "CONFLICTS OF INTEREST",
                "COMPETING INTERESTS",
                "AUTHOR CONTRIBUTIONS",
                "SUPPLEMENTARY MATERIAL",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Stage 2: sentence segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Sentences longer than this are dropped as extraction noise
    pub max_sentence_chars: usize,
    /// Sentences shorter than this (after trim) are dropped
    pub min_sentence_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_sentence_chars: 5000,
            min_sentence_chars: 3,
        }
    }
}

/// Stage 3: entity extraction ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Provider names in priority order; unknown names are rejected at
    /// ensemble construction
    pub providers: Vec<String>,
    /// Two mentions are the same detection if their spans overlap by more
    /// than this fraction of the shorter span
    pub overlap_fraction: f32,
    /// Mentions shorter than this are dropped unless they look like an
    /// uppercase acronym
    pub min_mention_len: usize,
    pub max_mention_len: usize,
    /// Canonical keys to discard outright
    pub stop_terms: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            providers: vec!["lexicon".to_string(), "pattern".to_string()],
            overlap_fraction: 0.5,
            min_mention_len: 3,
            max_mention_len: 80,
            stop_terms: [
                "figure", "fig", "table", "supplement", "introduction", "abstract", "results",
                "discussion", "conclusion", "conclusions", "methods", "pubmed", "https", "http",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Stage 4: relation extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Number of following sentences (same section) included in the
    /// co-occurrence window
    pub window: usize,
    /// Emit untyped co-occurrence relations when no trigger fires
    pub cooccurrence: bool,
    /// Allow pairs of entities with the same type
    pub allow_same_type_pairs: bool,
    /// Top-K entities (by mention confidence) considered per window
    pub max_entities_per_window: usize,
    /// Evidence text is truncated to this many characters
    pub max_evidence_chars: usize,
    pub triggers: TriggerLexicon,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            window: 1,
            cooccurrence: true,
            allow_same_type_pairs: false,
            max_entities_per_window: 40,
            max_evidence_chars: 240,
            triggers: TriggerLexicon::default(),
        }
    }
}

/// Curated verb lemmas partitioned into directed relation types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerLexicon {
    pub activates: Vec<String>,
    pub inhibits: Vec<String>,
    pub regulates: Vec<String>,
    pub interacts_with: Vec<String>,
    pub expressed_in: Vec<String>,
}

impl Default for TriggerLexicon {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            activates: words(&["activate", "stimulate", "upregulate", "induce", "promote", "enhance"]),
            inhibits: words(&["inhibit", "suppress", "downregulate", "block", "attenuate", "impair"]),
            regulates: words(&["regulate", "modulate", "control", "affect", "alter"]),
            interacts_with: words(&["interact", "bind", "associate", "complex"]),
            expressed_in: words(&["express", "detect", "localize", "present"]),
        }
    }
}

/// Stage 6: subgraph reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Node budget for the whole-document overview
    pub overview_budget: usize,
    /// Node budget per section view
    pub section_budget: usize,
    /// Maximum length of section slugs in artifact filenames
    pub slug_max_len: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            overview_budget: 40,
            section_budget: 40,
            slug_max_len: 40,
        }
    }
}
