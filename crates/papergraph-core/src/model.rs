//! Domain models for the extraction pipeline
//!
//! Every record that crosses a stage boundary lives here so that stage
//! artifacts can be serialized, cached, and reloaded without the stage
//! crates depending on each other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Input document
// ============================================================================

/// One section of a structured input document, as produced by the external
/// document-structuring service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionInput {
    pub heading: String,
    pub text: String,
}

/// A page-break point: cumulative character offset at which `page` starts.
/// Optional; supplied alongside the structured document when the source
/// layout is known.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageBreak {
    pub page: u32,
    pub offset: usize,
}

/// Structured input document: ordered sections plus optional page breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub document_id: String,
    pub sections: Vec<SectionInput>,
    #[serde(default)]
    pub page_breaks: Vec<PageBreak>,
}

// ============================================================================
// Sections and sentences (stages 1-2)
// ============================================================================

/// A half-open character span `[start, end)`.
///
/// Offsets are UTF-8 byte offsets and always fall on char boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSpan {
    pub start: usize,
    pub end: usize,
}

impl OffsetSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Length of the overlap with another span.
    pub fn overlap(&self, other: &OffsetSpan) -> usize {
        let lo = self.start.max(other.start);
        let hi = self.end.min(other.end);
        hi.saturating_sub(lo)
    }
}

/// A section retained by the Section Filter, with its baseline into the
/// reconstructed document text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetainedSection {
    /// Ordinal among retained sections
    pub index: usize,
    /// Normalized heading
    pub heading: String,
    pub text: String,
    /// Start offset of this section's text in the reconstructed document
    pub global_start: usize,
    pub global_end: usize,
}

/// A sentence with its three offset frames.
///
/// Invariant: `document_text[global] == section_text[section] == text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    /// Monotonic id within the document
    pub id: u32,
    pub section_index: usize,
    pub section_heading: String,
    pub text: String,
    pub section_offsets: OffsetSpan,
    pub global_offsets: OffsetSpan,
}

// ============================================================================
// Entity types
// ============================================================================

/// Canonical entity type set.
///
/// Providers report heterogeneous labels; [`EntityType::normalize`] maps
/// them onto this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Gene,
    Chemical,
    Disease,
    Phenotype,
    CellType,
    Tissue,
    Anatomy,
    Species,
    Process,
    Pathway,
    Variant,
    Condition,
    Reagent,
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gene => "GENE",
            Self::Chemical => "CHEMICAL",
            Self::Disease => "DISEASE",
            Self::Phenotype => "PHENOTYPE",
            Self::CellType => "CELL_TYPE",
            Self::Tissue => "TISSUE",
            Self::Anatomy => "ANATOMY",
            Self::Species => "SPECIES",
            Self::Process => "PROCESS",
            Self::Pathway => "PATHWAY",
            Self::Variant => "VARIANT",
            Self::Condition => "CONDITION",
            Self::Reagent => "REAGENT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Map a raw provider label onto the canonical type set.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "GENE" | "GENE_OR_GENE_PRODUCT" | "GENE_OR_PROTEIN" | "GENE_PRODUCT" | "PROTEIN"
            | "PROTEIN_FAMILY" | "DNA" | "RNA" => Self::Gene,
            "CHEMICAL" | "CHEM" | "DRUG" | "CHEBI" | "SMALL_MOLECULE" => Self::Chemical,
            "DISEASE" | "DISEASE_OR_SYNDROME" | "PATHOLOGY" => Self::Disease,
            "PHENOTYPE" | "SIGN_OR_SYMPTOM" => Self::Phenotype,
            "CELL" | "CELL_TYPE" | "CELL_LINE" => Self::CellType,
            "TISSUE" => Self::Tissue,
            "ANATOMY" | "ANATOMICAL_SYSTEM" | "BODY_PART" | "ORGAN" | "ORGANISM_SUBSTANCE" => {
                Self::Anatomy
            }
            "SPECIES" | "ORGANISM" | "BACTERIUM" | "VIRUS" | "TAXON" => Self::Species,
            "PROCESS" | "BIOLOGICAL_PROCESS" => Self::Process,
            "PATHWAY" => Self::Pathway,
            "VARIANT" | "MUTATION" => Self::Variant,
            "CONDITION" | "EXPERIMENTAL_CONDITION" | "ENVIRONMENT" => Self::Condition,
            "REAGENT" => Self::Reagent,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Mentions and entities (stage 3)
// ============================================================================

/// A single detection of text by one provider, after overlap resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    /// Id of the canonical entity this mention merged into
    pub entity_id: u32,
    pub sentence_id: u32,
    pub section_index: usize,
    pub section_heading: String,
    /// Surface text as it appears in the sentence
    pub text: String,
    pub entity_type: EntityType,
    pub provider: String,
    pub confidence: f32,
    /// Types reported by lower-priority providers for the same span
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alt_types: Vec<EntityType>,
    pub sentence_offsets: OffsetSpan,
    pub section_offsets: OffsetSpan,
    pub global_offsets: OffsetSpan,
}

/// Navigation anchor pointing a graph node back to source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavAnchor {
    pub section: String,
    pub sentence_id: u32,
    pub char_start: usize,
    pub char_end: usize,
    /// Stable anchor key: `{document_id}_{char_start}_{char_end}`
    pub anchor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl NavAnchor {
    pub fn new(document_id: &str, section: &str, sentence_id: u32, span: OffsetSpan) -> Self {
        Self {
            section: section.to_string(),
            sentence_id,
            char_start: span.start,
            char_end: span.end,
            anchor: format!("{}_{}_{}", document_id, span.start, span.end),
            page: None,
        }
    }
}

/// A canonical, deduplicated entity.
///
/// The canonical key -> id mapping is a bijection within one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    /// Normalized surface form (lower-cased, whitespace-collapsed)
    pub canonical_key: String,
    /// Representative surface form (first mention)
    pub label: String,
    pub entity_type: EntityType,
    /// Number of contributing mentions
    pub frequency: u32,
    /// Sorted headings of sections this entity appears in
    pub sections: Vec<String>,
    pub anchor: NavAnchor,
    /// Confidence of the mention the anchor points at
    pub anchor_confidence: f32,
}

// ============================================================================
// Relations (stage 4)
// ============================================================================

/// Relation type set: directed trigger-based types plus the undirected
/// co-occurrence fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "ACTIVATES")]
    Activates,
    #[serde(rename = "INHIBITS")]
    Inhibits,
    #[serde(rename = "REGULATES")]
    Regulates,
    #[serde(rename = "INTERACTS_WITH")]
    InteractsWith,
    #[serde(rename = "EXPRESSED_IN")]
    ExpressedIn,
    #[serde(rename = "COOCCURS")]
    CoOccurs,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activates => "ACTIVATES",
            Self::Inhibits => "INHIBITS",
            Self::Regulates => "REGULATES",
            Self::InteractsWith => "INTERACTS_WITH",
            Self::ExpressedIn => "EXPRESSED_IN",
            Self::CoOccurs => "COOCCURS",
        }
    }

    /// Whether this type carries a direction (trigger-based types do,
    /// co-occurrence does not).
    pub fn is_directed(&self) -> bool {
        !matches!(self, Self::CoOccurs)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One evidenced relation instance between two entities.
///
/// Multiple instances between the same pair are retained distinctly so
/// support strength can be derived downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: u32,
    pub relation_type: RelationType,
    pub source: u32,
    pub target: u32,
    pub sentence_id: u32,
    pub section_heading: String,
    /// Evidence text, truncated
    pub evidence: String,
    /// Trigger lemma that fired, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

// ============================================================================
// Graph and views (stages 5-6)
// ============================================================================

/// Aggregate statistics for an assembled document graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub n_nodes: usize,
    pub n_edges: usize,
    pub entity_types: BTreeMap<String, usize>,
    pub relation_types: BTreeMap<String, usize>,
    pub n_components: usize,
    pub largest_component: usize,
    pub avg_degree: f64,
    pub median_degree: f64,
    pub isolated_nodes: usize,
    /// Percentage of relations backed by a trigger word
    pub relations_with_trigger_pct: f64,
}

/// The full per-document graph: single source of truth for all views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGraph {
    pub document_id: String,
    pub nodes: Vec<Entity>,
    pub edges: Vec<Relation>,
    pub stats: GraphStats,
}

/// Node record in exported views (graph core, overview, section views).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: u32,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub freq: u32,
    pub sections: Vec<String>,
    pub nav: NavAnchor,
}

impl From<&Entity> for GraphNode {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id,
            label: e.label.clone(),
            entity_type: e.entity_type,
            freq: e.frequency,
            sections: e.sections.clone(),
            nav: e.anchor.clone(),
        }
    }
}

/// Edge record in exported views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: u32,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub source: u32,
    pub target: u32,
}

impl From<&Relation> for GraphEdge {
    fn from(r: &Relation) -> Self {
        Self {
            id: r.id,
            relation_type: r.relation_type,
            source: r.source,
            target: r.target,
        }
    }
}

/// A budgeted, connected derivation of the document graph: either the
/// whole-document overview or one section's view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphView {
    pub document_id: String,
    /// "overview" or the section heading
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Node budget the view was derived under
    pub budget: usize,
    pub n_nodes: usize,
    pub n_edges: usize,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Entry in the section index consumed by the UI for navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionIndexEntry {
    pub section: String,
    pub relation_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}
