//! Relation Extractor (stage 4)
//!
//! Scans each sentence (plus a small window of following sentences within
//! the same section) for co-occurring entity pairs. A pair whose mentions
//! share a sentence is checked against the trigger lexicon; a firing
//! trigger emits a directed, typed relation, otherwise an undirected
//! co-occurrence is emitted when enabled. Instances between the same pair
//! are all retained so support strength can be aggregated downstream.

use std::collections::{BTreeMap, HashMap};

use papergraph_core::config::RelationConfig;
use papergraph_core::{Mention, Relation, RelationType, Sentence};
use tracing::debug;

/// Trigger-driven and co-occurrence relation extraction.
pub struct RelationExtractor {
    config: RelationConfig,
    /// lemma -> relation type
    lexicon: HashMap<String, RelationType>,
}

impl RelationExtractor {
    pub fn new(config: RelationConfig) -> Self {
        let mut lexicon = HashMap::new();
        let t = &config.triggers;
        for (lemmas, rel_type) in [
            (&t.activates, RelationType::Activates),
            (&t.inhibits, RelationType::Inhibits),
            (&t.regulates, RelationType::Regulates),
            (&t.interacts_with, RelationType::InteractsWith),
            (&t.expressed_in, RelationType::ExpressedIn),
        ] {
            for lemma in lemmas {
                lexicon.insert(lemma.to_lowercase(), rel_type);
            }
        }
        Self { config, lexicon }
    }

    /// Extract relations from all sentence windows.
    pub fn extract(&self, sentences: &[Sentence], mentions: &[Mention]) -> Vec<Relation> {
        let mut by_sentence: BTreeMap<u32, Vec<&Mention>> = BTreeMap::new();
        for m in mentions {
            by_sentence.entry(m.sentence_id).or_default().push(m);
        }

        let mut relations = Vec::new();
        let mut next_id: u32 = 0;

        for (anchor_idx, anchor) in sentences.iter().enumerate() {
            let window_end = (anchor_idx + self.config.window + 1).min(sentences.len());
            let window: Vec<&Sentence> = sentences[anchor_idx..window_end]
                .iter()
                .take_while(|s| s.section_index == anchor.section_index)
                .collect();

            // Best mention per entity within the window, capped to the
            // top-K entities by confidence to bound pair blow-up.
            let mut reps: BTreeMap<u32, &Mention> = BTreeMap::new();
            for sentence in &window {
                for m in by_sentence.get(&sentence.id).into_iter().flatten() {
                    reps.entry(m.entity_id)
                        .and_modify(|best| {
                            if m.confidence > best.confidence
                                || (m.confidence == best.confidence
                                    && m.global_offsets.start < best.global_offsets.start)
                            {
                                *best = m;
                            }
                        })
                        .or_insert(m);
                }
            }
            let mut ranked: Vec<&Mention> = reps.into_values().collect();
            ranked.sort_by(|a, b| {
                b.confidence
                    .total_cmp(&a.confidence)
                    .then(a.entity_id.cmp(&b.entity_id))
            });
            ranked.truncate(self.config.max_entities_per_window);
            ranked.sort_by_key(|m| m.entity_id);

            for i in 0..ranked.len() {
                for j in (i + 1)..ranked.len() {
                    let (a, b) = (ranked[i], ranked[j]);
                    // Each pair is handled at the anchor holding its
                    // earliest mention; later anchors skip it.
                    if a.sentence_id != anchor.id && b.sentence_id != anchor.id {
                        continue;
                    }
                    if let Some(rel) = self.relate_pair(a, b, anchor, &by_sentence, next_id) {
                        relations.push(rel);
                        next_id += 1;
                    }
                }
            }
        }
        debug!(relations = relations.len(), "relation extraction complete");
        relations
    }

    /// Produce at most one relation instance for an entity pair at this
    /// anchor: trigger-typed when both mentions share the anchor sentence
    /// and a lemma fires, co-occurrence otherwise.
    fn relate_pair(
        &self,
        a: &Mention,
        b: &Mention,
        anchor: &Sentence,
        by_sentence: &BTreeMap<u32, Vec<&Mention>>,
        id: u32,
    ) -> Option<Relation> {
        if a.entity_id == b.entity_id {
            return None;
        }

        // Trigger check applies when both entities are mentioned in the
        // anchor sentence itself.
        let a_in_anchor = self.mention_in(a.entity_id, anchor.id, by_sentence);
        let b_in_anchor = self.mention_in(b.entity_id, anchor.id, by_sentence);
        if let (Some(ma), Some(mb)) = (a_in_anchor, b_in_anchor) {
            if let Some((lemma, rel_type)) = self.find_trigger(anchor, ma, mb) {
                let (src, tgt) = if ma.global_offsets.start <= mb.global_offsets.start {
                    (ma, mb)
                } else {
                    (mb, ma)
                };
                return Some(Relation {
                    id,
                    relation_type: rel_type,
                    source: src.entity_id,
                    target: tgt.entity_id,
                    sentence_id: anchor.id,
                    section_heading: anchor.section_heading.clone(),
                    evidence: truncate_chars(&anchor.text, self.config.max_evidence_chars),
                    trigger: Some(lemma),
                });
            }
        }

        if !self.config.cooccurrence {
            return None;
        }
        // Same-type pairs are excluded from the co-occurrence fallback;
        // a firing trigger above is considered evidence enough.
        if !self.config.allow_same_type_pairs && a.entity_type == b.entity_type {
            return None;
        }
        let (src, tgt) = if a.global_offsets.start <= b.global_offsets.start {
            (a, b)
        } else {
            (b, a)
        };
        Some(Relation {
            id,
            relation_type: RelationType::CoOccurs,
            source: src.entity_id,
            target: tgt.entity_id,
            sentence_id: anchor.id,
            section_heading: anchor.section_heading.clone(),
            evidence: truncate_chars(&anchor.text, self.config.max_evidence_chars),
            trigger: None,
        })
    }

    /// Best mention of `entity_id` inside sentence `sentence_id`, if any.
    fn mention_in<'a>(
        &self,
        entity_id: u32,
        sentence_id: u32,
        by_sentence: &BTreeMap<u32, Vec<&'a Mention>>,
    ) -> Option<&'a Mention> {
        by_sentence
            .get(&sentence_id)?
            .iter()
            .filter(|m| m.entity_id == entity_id)
            .min_by(|a, b| {
                b.confidence
                    .total_cmp(&a.confidence)
                    .then(a.sentence_offsets.start.cmp(&b.sentence_offsets.start))
            })
            .copied()
    }

    /// Search for a trigger lemma between the two mentions, allowing a
    /// short tail past the later mention.
    fn find_trigger(
        &self,
        sentence: &Sentence,
        a: &Mention,
        b: &Mention,
    ) -> Option<(String, RelationType)> {
        const TAIL: usize = 40;
        let (first, second) = if a.sentence_offsets.start <= b.sentence_offsets.start {
            (a, b)
        } else {
            (b, a)
        };
        let text = &sentence.text;
        let start = first.sentence_offsets.end.min(text.len());
        let mut end = (second.sentence_offsets.end + TAIL).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut probe = start;
        while probe < end && !text.is_char_boundary(probe) {
            probe += 1;
        }
        let context = &text[probe..end];

        for token in context
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if let Some(hit) = self.lookup_lemma(&token) {
                return Some(hit);
            }
        }
        None
    }

    /// Try the token and common inflection-stripped variants against the
    /// lemma lexicon.
    fn lookup_lemma(&self, token: &str) -> Option<(String, RelationType)> {
        let mut candidates: Vec<String> = vec![token.to_string()];
        for suffix in ["es", "s", "ed", "d", "ing"] {
            if let Some(stem) = token.strip_suffix(suffix) {
                candidates.push(stem.to_string());
                if suffix == "ing" {
                    candidates.push(format!("{stem}e"));
                }
            }
        }
        for candidate in candidates {
            if let Some(&rel_type) = self.lexicon.get(candidate.as_str()) {
                return Some((candidate, rel_type));
            }
        }
        None
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use papergraph_core::{EntityType, OffsetSpan};

    fn sentence(id: u32, section_index: usize, text: &str, global_start: usize) -> Sentence {
        Sentence {
            id,
            section_index,
            section_heading: "RESULTS".to_string(),
            text: text.to_string(),
            section_offsets: OffsetSpan::new(global_start, global_start + text.len()),
            global_offsets: OffsetSpan::new(global_start, global_start + text.len()),
        }
    }

    fn mention(
        entity_id: u32,
        sentence: &Sentence,
        start: usize,
        end: usize,
        entity_type: EntityType,
    ) -> Mention {
        Mention {
            entity_id,
            sentence_id: sentence.id,
            section_index: sentence.section_index,
            section_heading: sentence.section_heading.clone(),
            text: sentence.text[start..end].to_string(),
            entity_type,
            provider: "lexicon".to_string(),
            confidence: 0.9,
            alt_types: Vec::new(),
            sentence_offsets: OffsetSpan::new(start, end),
            section_offsets: OffsetSpan::new(
                sentence.section_offsets.start + start,
                sentence.section_offsets.start + end,
            ),
            global_offsets: OffsetSpan::new(
                sentence.global_offsets.start + start,
                sentence.global_offsets.start + end,
            ),
        }
    }

    fn config_with_window(window: usize) -> RelationConfig {
        RelationConfig {
            window,
            ..Default::default()
        }
    }

    #[test]
    fn test_trigger_relations_spec_scenario() {
        let s0 = sentence(0, 0, "Gene A activates Gene B.", 0);
        let s1 = sentence(1, 0, "Gene B regulates Process C.", 30);
        let mentions = vec![
            mention(0, &s0, 0, 6, EntityType::Gene),    // Gene A
            mention(1, &s0, 17, 23, EntityType::Gene),  // Gene B
            mention(1, &s1, 0, 6, EntityType::Gene),    // Gene B
            mention(2, &s1, 17, 26, EntityType::Process), // Process C
        ];
        let extractor = RelationExtractor::new(config_with_window(0));
        let relations = extractor.extract(&[s0, s1], &mentions);

        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].relation_type, RelationType::Activates);
        assert_eq!((relations[0].source, relations[0].target), (0, 1));
        assert_eq!(relations[0].trigger.as_deref(), Some("activate"));
        assert_eq!(relations[1].relation_type, RelationType::Regulates);
        assert_eq!((relations[1].source, relations[1].target), (1, 2));
        assert_eq!(relations[1].sentence_id, 1);
    }

    #[test]
    fn test_cooccurrence_window_across_sentences() {
        let s0 = sentence(0, 0, "Microgravity was sustained for ten days.", 0);
        let s1 = sentence(1, 0, "Apoptosis increased markedly afterwards.", 50);
        let mentions = vec![
            mention(0, &s0, 0, 12, EntityType::Phenotype),
            mention(1, &s1, 0, 9, EntityType::Process),
        ];
        let extractor = RelationExtractor::new(config_with_window(1));
        let relations = extractor.extract(&[s0.clone(), s1.clone()], &mentions);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].relation_type, RelationType::CoOccurs);

        // window 0: the pair never shares a window
        let extractor = RelationExtractor::new(config_with_window(0));
        let relations = extractor.extract(&[s0, s1], &mentions);
        assert!(relations.is_empty());
    }

    #[test]
    fn test_window_stops_at_section_boundary() {
        let s0 = sentence(0, 0, "Microgravity was sustained for ten days.", 0);
        let s1 = sentence(1, 1, "Apoptosis increased markedly afterwards.", 50);
        let mentions = vec![
            mention(0, &s0, 0, 12, EntityType::Phenotype),
            mention(1, &s1, 0, 9, EntityType::Process),
        ];
        let extractor = RelationExtractor::new(config_with_window(2));
        let relations = extractor.extract(&[s0, s1], &mentions);
        assert!(relations.is_empty());
    }

    #[test]
    fn test_same_type_pairs_excluded_from_cooccurrence() {
        let s0 = sentence(0, 0, "TP53 and EGFR appeared in the same assay.", 0);
        let mentions = vec![
            mention(0, &s0, 0, 4, EntityType::Gene),
            mention(1, &s0, 9, 13, EntityType::Gene),
        ];
        let extractor = RelationExtractor::new(config_with_window(0));
        assert!(extractor.extract(&[s0.clone()], &mentions).is_empty());

        let config = RelationConfig {
            allow_same_type_pairs: true,
            ..config_with_window(0)
        };
        let relations = RelationExtractor::new(config).extract(&[s0], &mentions);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].relation_type, RelationType::CoOccurs);
    }

    #[test]
    fn test_inflected_trigger_matches_lemma() {
        let s0 = sentence(0, 0, "TP53 strongly inhibited the DNA damage response.", 0);
        let mentions = vec![
            mention(0, &s0, 0, 4, EntityType::Gene),
            mention(1, &s0, 28, 38, EntityType::Process), // "DNA damage"
        ];
        let extractor = RelationExtractor::new(config_with_window(0));
        let relations = extractor.extract(&[s0], &mentions);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].relation_type, RelationType::Inhibits);
        assert_eq!(relations[0].trigger.as_deref(), Some("inhibit"));
        assert_eq!(relations[0].source, 0);
    }

    #[test]
    fn test_pair_cap_bounds_enumeration() {
        let s0 = sentence(0, 0, "Many entities share one long sentence here today.", 0);
        let types = [
            EntityType::Gene,
            EntityType::Process,
            EntityType::Disease,
            EntityType::Tissue,
            EntityType::Species,
        ];
        let mentions: Vec<Mention> = (0..5u32)
            .map(|i| mention(i, &s0, i as usize * 5, i as usize * 5 + 4, types[i as usize]))
            .collect();
        let config = RelationConfig {
            max_entities_per_window: 2,
            ..config_with_window(0)
        };
        let relations = RelationExtractor::new(config).extract(&[s0], &mentions);
        // only one pair survives the top-2 cap
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn test_evidence_truncation() {
        let long_text = format!("TP53 modulates the {} response.", "very ".repeat(100));
        let len = long_text.len();
        let s0 = sentence(0, 0, &long_text, 0);
        let mentions = vec![
            mention(0, &s0, 0, 4, EntityType::Gene),
            mention(1, &s0, len - 9, len - 1, EntityType::Process),
        ];
        let extractor = RelationExtractor::new(config_with_window(0));
        let relations = extractor.extract(&[s0], &mentions);
        assert_eq!(relations.len(), 1);
        assert!(relations[0].evidence.len() <= 240);
        assert_eq!(relations[0].trigger.as_deref(), Some("modulate"));
    }
}
