//! Papergraph Extract - Entity and relation extraction
//!
//! Stage 3 runs an ordered ensemble of mention providers over each
//! sentence, resolves overlapping detections by provider priority, and
//! merges the survivors into a canonical per-document entity registry.
//! Stage 4 scans sentence windows for co-occurring entity pairs and
//! trigger-word patterns, producing typed, evidenced relation records.

use papergraph_core::Result;

pub mod ensemble;
pub mod providers;
pub mod registry;
pub mod relation;

pub use ensemble::EntityEnsemble;
pub use providers::{LexiconProvider, PatternProvider};
pub use registry::EntityRegistry;
pub use relation::RelationExtractor;

/// A raw span detected by one provider, with sentence-local offsets and
/// the provider's own (un-normalized) type label.
#[derive(Debug, Clone)]
pub struct ProviderSpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub confidence: f32,
}

/// Capability interface for mention providers.
///
/// Providers are independent and run in a fixed priority order; adding or
/// removing one is a configuration change, not a code branch.
pub trait MentionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Detect entity spans in one sentence. A failure here is scoped to
    /// this provider and this sentence; the ensemble logs and moves on.
    fn extract(&self, sentence: &str) -> Result<Vec<ProviderSpan>>;
}
