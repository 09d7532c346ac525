//! Papergraph Segment - Section filtering and sentence segmentation
//!
//! Stage 1 selects the document sections worth processing and lays them out
//! on a single offset-tracked text stream. Stage 2 splits each retained
//! section into sentences carrying three offset frames (sentence-local,
//! section-local, document-global) so every downstream entity and relation
//! stays navigable back to source text.

pub mod filter;
pub mod segmenter;

pub use filter::{reconstruct_text, SectionFilter, SECTION_SEPARATOR};
pub use segmenter::SentenceSegmenter;
