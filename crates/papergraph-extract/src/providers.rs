//! Concrete mention providers
//!
//! Two in-process providers cover the ensemble:
//! - [`LexiconProvider`]: dictionary of curated domain terms with aliases
//! - [`PatternProvider`]: regex rules for symbol-shaped mentions (gene
//!   symbols, variants, conditions, pathway phrases)

use std::collections::HashMap;

use regex::Regex;

use crate::{MentionProvider, ProviderSpan};
use papergraph_core::{PipelineError, Result};

// ============================================================================
// Lexicon provider
// ============================================================================

/// Dictionary entry: a term, its raw type label, and surface aliases.
#[derive(Debug, Clone)]
pub struct LexiconEntry {
    pub term: String,
    pub label: String,
    pub aliases: Vec<String>,
}

/// Dictionary-based provider. Matches terms and aliases case-insensitively
/// on word boundaries; aliases score slightly below the main term.
pub struct LexiconProvider {
    entries: Vec<LexiconEntry>,
    /// lowercase surface -> (index into entries, is_alias)
    lookup: HashMap<String, (usize, bool)>,
}

impl LexiconProvider {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Default lexicon for space-biology publications.
    pub fn space_biology() -> Self {
        let mut p = Self::new();
        p.add_term("microgravity", "PHENOTYPE", &["weightlessness"]);
        p.add_term("spaceflight", "CONDITION", &["space flight"]);
        p.add_term("radiation", "CONDITION", &["ionizing radiation", "cosmic radiation"]);
        p.add_term("hindlimb unloading", "CONDITION", &["hindlimb suspension"]);
        p.add_term("bone loss", "PHENOTYPE", &["bone density loss"]);
        p.add_term("muscle atrophy", "PHENOTYPE", &["muscle wasting"]);
        p.add_term("oxidative stress", "PROCESS", &[]);
        p.add_term("apoptosis", "PROCESS", &["programmed cell death"]);
        p.add_term("inflammation", "PROCESS", &["inflammatory response"]);
        p.add_term("gene expression", "PROCESS", &[]);
        p.add_term("dna damage", "PROCESS", &["dna repair"]);
        p.add_term("cell cycle", "PROCESS", &[]);
        p.add_term("osteoblast", "CELL_TYPE", &["osteoblasts"]);
        p.add_term("osteoclast", "CELL_TYPE", &["osteoclasts"]);
        p.add_term("macrophage", "CELL_TYPE", &["macrophages"]);
        p.add_term("lymphocyte", "CELL_TYPE", &["lymphocytes", "t cells", "b cells"]);
        p.add_term("cardiomyocyte", "CELL_TYPE", &["cardiomyocytes"]);
        p.add_term("mouse", "SPECIES", &["mice", "mus musculus"]);
        p.add_term("rat", "SPECIES", &["rats", "rattus norvegicus"]);
        p.add_term("human", "SPECIES", &["humans", "homo sapiens"]);
        p.add_term("arabidopsis", "SPECIES", &["arabidopsis thaliana"]);
        p.add_term("bone", "TISSUE", &["bone tissue"]);
        p.add_term("skeletal muscle", "TISSUE", &["muscle tissue"]);
        p.add_term("liver", "TISSUE", &[]);
        p.add_term("retina", "TISSUE", &["retinal tissue"]);
        p.add_term("osteoporosis", "DISEASE", &[]);
        p.add_term("cancer", "DISEASE", &["tumor", "carcinoma"]);
        p.add_term("cataract", "DISEASE", &["cataracts"]);
        p.add_term("wnt signaling", "PATHWAY", &["wnt pathway"]);
        p.add_term("mapk pathway", "PATHWAY", &["mapk signaling"]);
        p.add_term("insulin signaling", "PATHWAY", &["insulin pathway"]);
        p.add_term("trizol", "REAGENT", &[]);
        p.add_term("rneasy", "REAGENT", &[]);
        p
    }

    pub fn add_term(&mut self, term: &str, label: &str, aliases: &[&str]) {
        let index = self.entries.len();
        self.lookup.insert(term.to_lowercase(), (index, false));
        for alias in aliases {
            self.lookup.insert(alias.to_lowercase(), (index, true));
        }
        self.entries.push(LexiconEntry {
            term: term.to_string(),
            label: label.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        });
    }

    fn word_bounded(text: &str, start: usize, end: usize) -> bool {
        let before_ok = start == 0
            || text[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = end == text.len()
            || text[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    }
}

impl Default for LexiconProvider {
    fn default() -> Self {
        Self::space_biology()
    }
}

impl MentionProvider for LexiconProvider {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn extract(&self, sentence: &str) -> Result<Vec<ProviderSpan>> {
        let lower = sentence.to_lowercase();
        if lower.len() != sentence.len() {
            // to_lowercase can change byte lengths for non-ASCII text;
            // offsets would no longer line up with the original sentence.
            return Err(PipelineError::Provider {
                provider: "lexicon".to_string(),
                message: "sentence lowercasing changed byte length".to_string(),
            });
        }
        let mut spans = Vec::new();
        for (surface, &(index, is_alias)) in &self.lookup {
            for (start, m) in lower.match_indices(surface.as_str()) {
                let end = start + m.len();
                if !Self::word_bounded(&lower, start, end) {
                    continue;
                }
                spans.push(ProviderSpan {
                    start,
                    end,
                    label: self.entries[index].label.clone(),
                    confidence: if is_alias { 0.9 } else { 0.95 },
                });
            }
        }
        // lookup iteration order is not stable; sort for determinism
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        Ok(spans)
    }
}

// ============================================================================
// Pattern provider
// ============================================================================

/// Regex-based provider for symbol-shaped mentions.
pub struct PatternProvider {
    patterns: Vec<(Regex, String, f32)>,
}

impl PatternProvider {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Default rules for biomedical text.
    pub fn biomedical() -> Self {
        let mut p = Self::new();
        // Uppercase gene/protein symbols: TP53, EGFR, GAPDH
        p.add_pattern(r"\b[A-Z][A-Z0-9]{2,6}\b", "GENE", 0.7);
        // Mouse-style symbols: Runx2, Sost1
        p.add_pattern(r"\b[A-Z][a-z]{2,6}\d[a-z]?\b", "GENE", 0.6);
        // dbSNP variant ids
        p.add_pattern(r"\brs\d{3,}\b", "VARIANT", 0.9);
        // Temperature conditions: 37°C, 95 °C
        p.add_pattern(r"\b\d{1,3}\s?°C", "EXPERIMENTAL_CONDITION", 0.85);
        // Pathway phrases: Wnt signaling, NF-kB pathway
        p.add_pattern(
            r"\b[A-Za-z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)?\s(?:signaling|pathway)\b",
            "PATHWAY",
            0.75,
        );
        // Cell-type phrases: dendritic cells, NK cells
        p.add_pattern(r"\b[A-Za-z][A-Za-z-]*\scells?\b", "CELL_TYPE", 0.6);
        p
    }

    pub fn add_pattern(&mut self, pattern: &str, label: &str, confidence: f32) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push((regex, label.to_string(), confidence));
        }
    }
}

impl Default for PatternProvider {
    fn default() -> Self {
        Self::biomedical()
    }
}

impl MentionProvider for PatternProvider {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, sentence: &str) -> Result<Vec<ProviderSpan>> {
        let mut spans = Vec::new();
        for (regex, label, confidence) in &self.patterns {
            for mat in regex.find_iter(sentence) {
                spans.push(ProviderSpan {
                    start: mat.start(),
                    end: mat.end(),
                    label: label.clone(),
                    confidence: *confidence,
                });
            }
        }
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicon_matches_terms_and_aliases() {
        let provider = LexiconProvider::space_biology();
        let spans = provider
            .extract("Microgravity induces bone loss in mice.")
            .unwrap();
        let surfaces: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
        // "Microgravity" (0..12), "bone loss" (21..30), "mice" (34..38)
        assert!(surfaces.contains(&(0, 12)));
        assert!(surfaces.contains(&(21, 30)));
        assert!(surfaces.contains(&(34, 38)));
    }

    #[test]
    fn test_lexicon_respects_word_boundaries() {
        let provider = LexiconProvider::space_biology();
        // "rat" must not fire inside "strateg" or "moderate"
        let spans = provider
            .extract("A moderate strategy was chosen for this study.")
            .unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn test_pattern_gene_symbols() {
        let provider = PatternProvider::biomedical();
        let spans = provider.extract("TP53 and Runx2 were upregulated.").unwrap();
        let labels: Vec<&str> = spans.iter().map(|s| s.label.as_str()).collect();
        assert!(labels.contains(&"GENE"));
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 4);
    }

    #[test]
    fn test_pattern_variant_and_pathway() {
        let provider = PatternProvider::biomedical();
        let spans = provider
            .extract("Variant rs12345 affects Wnt signaling strongly.")
            .unwrap();
        assert!(spans.iter().any(|s| s.label == "VARIANT"));
        assert!(spans.iter().any(|s| s.label == "PATHWAY"));
    }
}
