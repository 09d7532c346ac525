//! Papergraph Core - Domain models, errors, and configuration
//!
//! This crate defines the shared types used throughout the papergraph
//! pipeline:
//! - Document input and offset-tracked sections/sentences
//! - Mention, entity, and relation records
//! - The assembled document graph and its budgeted subgraph views
//! - Common error types
//! - Configuration management

pub mod config;
pub mod model;

pub use config::{
    ConfigError, ExtractorConfig, PipelineConfig, RelationConfig, ReducerConfig,
    SectionFilterConfig, SegmenterConfig, TriggerLexicon,
};
pub use model::{
    DocumentGraph, DocumentInput, Entity, EntityType, GraphEdge, GraphNode, GraphStats, Mention,
    NavAnchor, OffsetSpan, PageBreak, Relation, RelationType, RetainedSection, SectionIndexEntry,
    SectionInput, Sentence, SubgraphView,
};

use thiserror::Error;

/// Core error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input document: {0}")]
    InvalidInput(String),

    #[error("Missing artifact for stage {stage}: {path}")]
    MissingArtifact { stage: &'static str, path: String },

    #[error("Offset integrity violation in sentence {sentence_id}: {detail}")]
    OffsetMismatch { sentence_id: u32, detail: String },

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Unknown entity id in relation: {0}")]
    UnknownEntity(u32),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
