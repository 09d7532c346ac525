//! Entity extraction ensemble (stage 3)
//!
//! Runs the configured providers in priority order over every sentence,
//! resolves overlapping detections, filters noise, and merges survivors
//! into the per-document entity registry.

use regex::Regex;

use crate::providers::{LexiconProvider, PatternProvider};
use crate::registry::EntityRegistry;
use crate::{MentionProvider, ProviderSpan};
use papergraph_core::config::ExtractorConfig;
use papergraph_core::{
    ConfigError, EntityType, Mention, OffsetSpan, PipelineError, Result, Sentence,
};
use tracing::{debug, warn};

struct Candidate {
    provider_rank: usize,
    provider: &'static str,
    span: ProviderSpan,
    alt_types: Vec<EntityType>,
}

/// Ordered ensemble of mention providers plus merge/filter policy.
pub struct EntityEnsemble {
    providers: Vec<Box<dyn MentionProvider>>,
    config: ExtractorConfig,
    numeric: Regex,
    figure_ref: Regex,
}

impl EntityEnsemble {
    /// Build the ensemble from configured provider names, in priority
    /// order. Unknown names are a configuration error.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let mut providers: Vec<Box<dyn MentionProvider>> = Vec::new();
        for name in &config.providers {
            match name.as_str() {
                "lexicon" => providers.push(Box::new(LexiconProvider::space_biology())),
                "pattern" => providers.push(Box::new(PatternProvider::biomedical())),
                other => {
                    return Err(PipelineError::Config(ConfigError::InvalidValue {
                        key: "extractor.providers".to_string(),
                        value: other.to_string(),
                    }))
                }
            }
        }
        Ok(Self::with_providers(providers, config.clone()))
    }

    pub fn with_providers(
        providers: Vec<Box<dyn MentionProvider>>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            providers,
            config,
            numeric: Regex::new(r"^\d+[a-z]?$").unwrap(),
            figure_ref: Regex::new(r"^(fig(ure)?s?|table|supp(lement(ary)?)?)\b").unwrap(),
        }
    }

    /// Extract mentions from all sentences and merge them into `registry`.
    ///
    /// Returns the flat mention list (with entity ids assigned) consumed
    /// by the relation extractor.
    pub fn extract_document(
        &self,
        sentences: &[Sentence],
        registry: &mut EntityRegistry,
    ) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for sentence in sentences {
            let accepted = self.extract_sentence(&sentence.text);
            for candidate in accepted {
                if let Some(mention) = self.merge_candidate(sentence, candidate, registry) {
                    mentions.push(mention);
                }
            }
        }
        debug!(
            mentions = mentions.len(),
            entities = registry.len(),
            "entity extraction complete"
        );
        mentions
    }

    /// Run all providers over one sentence and resolve overlaps.
    fn extract_sentence(&self, text: &str) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = Vec::new();
        for (rank, provider) in self.providers.iter().enumerate() {
            let spans = match provider.extract(text) {
                Ok(spans) => spans,
                Err(e) => {
                    // A failing provider is skipped for this sentence only.
                    warn!(provider = provider.name(), error = %e, "provider failed on sentence");
                    continue;
                }
            };
            for span in spans {
                if text.get(span.start..span.end).is_none() {
                    continue;
                }
                candidates.push(Candidate {
                    provider_rank: rank,
                    provider: provider.name(),
                    span,
                    alt_types: Vec::new(),
                });
            }
        }

        // Higher-priority providers first; within a provider, higher
        // confidence then earlier span.
        candidates.sort_by(|a, b| {
            a.provider_rank
                .cmp(&b.provider_rank)
                .then(b.span.confidence.total_cmp(&a.span.confidence))
                .then(a.span.start.cmp(&b.span.start))
                .then(a.span.end.cmp(&b.span.end))
        });

        let mut accepted: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            let cand_span = OffsetSpan::new(candidate.span.start, candidate.span.end);
            let mut absorbed = false;
            for winner in accepted.iter_mut() {
                let win_span = OffsetSpan::new(winner.span.start, winner.span.end);
                let overlap = cand_span.overlap(&win_span);
                let shorter = cand_span.len().min(win_span.len()).max(1);
                if overlap as f32 / shorter as f32 > self.config.overlap_fraction {
                    // Same detection: the loser's type is kept as an
                    // alternative for diagnostics.
                    let loser_type = EntityType::normalize(&candidate.span.label);
                    let winner_type = EntityType::normalize(&winner.span.label);
                    if loser_type != winner_type && !winner.alt_types.contains(&loser_type) {
                        winner.alt_types.push(loser_type);
                    }
                    absorbed = true;
                    break;
                }
            }
            if !absorbed {
                accepted.push(candidate);
            }
        }

        accepted.sort_by(|a, b| a.span.start.cmp(&b.span.start).then(a.span.end.cmp(&b.span.end)));
        accepted
    }

    /// Filter noise, canonicalize, and register one surviving candidate.
    fn merge_candidate(
        &self,
        sentence: &Sentence,
        candidate: Candidate,
        registry: &mut EntityRegistry,
    ) -> Option<Mention> {
        let surface = &sentence.text[candidate.span.start..candidate.span.end];
        let canonical = canonicalize(surface);
        if self.is_noise(surface, &canonical) {
            return None;
        }
        let entity_type = EntityType::normalize(&candidate.span.label);
        if entity_type == EntityType::Unknown {
            return None;
        }

        let sentence_offsets = OffsetSpan::new(candidate.span.start, candidate.span.end);
        let section_offsets = OffsetSpan::new(
            sentence.section_offsets.start + candidate.span.start,
            sentence.section_offsets.start + candidate.span.end,
        );
        let global_offsets = OffsetSpan::new(
            sentence.global_offsets.start + candidate.span.start,
            sentence.global_offsets.start + candidate.span.end,
        );

        let entity_id = registry.observe(
            &canonical,
            surface,
            entity_type,
            sentence,
            global_offsets,
            candidate.span.confidence,
        );

        Some(Mention {
            entity_id,
            sentence_id: sentence.id,
            section_index: sentence.section_index,
            section_heading: sentence.section_heading.clone(),
            text: surface.to_string(),
            entity_type,
            provider: candidate.provider.to_string(),
            confidence: candidate.span.confidence,
            alt_types: candidate.alt_types,
            sentence_offsets,
            section_offsets,
            global_offsets,
        })
    }

    fn is_noise(&self, surface: &str, canonical: &str) -> bool {
        if canonical.is_empty() || canonical.len() > self.config.max_mention_len {
            return true;
        }
        if self.numeric.is_match(canonical) {
            return true;
        }
        if self.figure_ref.is_match(canonical) {
            return true;
        }
        if canonical.chars().all(|c| !c.is_alphanumeric()) {
            return true;
        }
        if canonical.len() < self.config.min_mention_len && !is_acronym(surface) {
            return true;
        }
        self.config.stop_terms.iter().any(|t| t == canonical)
    }
}

/// Canonical key: lower-cased, whitespace-collapsed surface form.
pub fn canonicalize(surface: &str) -> String {
    surface
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Short uppercase tokens like "ATP" survive the minimum-length filter.
fn is_acronym(surface: &str) -> bool {
    surface.len() >= 2
        && surface.chars().any(|c| c.is_ascii_alphabetic())
        && surface
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
