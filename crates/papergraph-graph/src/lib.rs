//! Papergraph Graph - Graph assembly and subgraph reduction
//!
//! Stage 5 assembles the full per-document graph (nodes = canonical
//! entities, edges = relation instances) and computes its structural
//! statistics. Stage 6 derives size-bounded views: one whole-document
//! overview and one view per section, each under a hard node budget,
//! connected, and carrying navigation anchors back to source text.
//!
//! Ranking uses distinct-partner degree, not relation-instance count;
//! multi-edges exist in the graph but do not inflate a node's rank.

pub mod assemble;
pub mod reduce;

pub use assemble::GraphAssembler;
pub use reduce::{slugify, SubgraphReducer};
