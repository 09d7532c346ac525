//! Per-document entity registry
//!
//! The registry owns the canonical-key -> id mapping for one document's
//! run. It is an explicit mutable structure passed through the pipeline,
//! never a singleton, so parallel documents share nothing.

use std::collections::{BTreeSet, HashMap};

use papergraph_core::{Entity, EntityType, NavAnchor, OffsetSpan, Sentence};

struct EntityRecord {
    canonical_key: String,
    label: String,
    entity_type: EntityType,
    frequency: u32,
    sections: BTreeSet<String>,
    anchor: NavAnchor,
    anchor_confidence: f32,
}

/// Canonical entity registry for one document.
///
/// Ids are assigned in order of first observation, which is deterministic
/// for a fixed sentence order; the key -> id mapping is a bijection.
pub struct EntityRegistry {
    document_id: String,
    ids: HashMap<String, u32>,
    records: Vec<EntityRecord>,
}

impl EntityRegistry {
    pub fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            ids: HashMap::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record one mention of `canonical` and return its entity id.
    ///
    /// The first mention's offsets become the navigation anchor unless a
    /// later mention carries strictly higher extractor confidence. The
    /// entity type is fixed by the first mention.
    pub fn observe(
        &mut self,
        canonical: &str,
        surface: &str,
        entity_type: EntityType,
        sentence: &Sentence,
        global_offsets: OffsetSpan,
        confidence: f32,
    ) -> u32 {
        if let Some(&id) = self.ids.get(canonical) {
            let record = &mut self.records[id as usize];
            record.frequency += 1;
            record.sections.insert(sentence.section_heading.clone());
            if confidence > record.anchor_confidence {
                record.anchor = NavAnchor::new(
                    &self.document_id,
                    &sentence.section_heading,
                    sentence.id,
                    global_offsets,
                );
                record.anchor_confidence = confidence;
            }
            return id;
        }

        let id = self.records.len() as u32;
        let mut sections = BTreeSet::new();
        sections.insert(sentence.section_heading.clone());
        self.records.push(EntityRecord {
            canonical_key: canonical.to_string(),
            label: surface.to_string(),
            entity_type,
            frequency: 1,
            sections,
            anchor: NavAnchor::new(
                &self.document_id,
                &sentence.section_heading,
                sentence.id,
                global_offsets,
            ),
            anchor_confidence: confidence,
        });
        self.ids.insert(canonical.to_string(), id);
        id
    }

    /// Finish the registry into the entity list, ordered by id.
    pub fn into_entities(self) -> Vec<Entity> {
        self.records
            .into_iter()
            .enumerate()
            .map(|(id, r)| Entity {
                id: id as u32,
                canonical_key: r.canonical_key,
                label: r.label,
                entity_type: r.entity_type,
                frequency: r.frequency,
                sections: r.sections.into_iter().collect(),
                anchor: r.anchor,
                anchor_confidence: r.anchor_confidence,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(id: u32, heading: &str) -> Sentence {
        Sentence {
            id,
            section_index: 0,
            section_heading: heading.to_string(),
            text: String::new(),
            section_offsets: OffsetSpan::new(0, 0),
            global_offsets: OffsetSpan::new(0, 0),
        }
    }

    #[test]
    fn test_bijection_and_id_order() {
        let mut registry = EntityRegistry::new("PMC1");
        let s = sentence(0, "RESULTS");
        let a = registry.observe("tp53", "TP53", EntityType::Gene, &s, OffsetSpan::new(0, 4), 0.7);
        let b = registry.observe("apoptosis", "apoptosis", EntityType::Process, &s, OffsetSpan::new(10, 19), 0.95);
        let a2 = registry.observe("tp53", "Tp53", EntityType::Gene, &s, OffsetSpan::new(30, 34), 0.6);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a2, a);

        let entities = registry.into_entities();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].canonical_key, "tp53");
        assert_eq!(entities[0].frequency, 2);
        // first mention's surface form stays the label
        assert_eq!(entities[0].label, "TP53");
    }

    #[test]
    fn test_anchor_upgrades_only_on_strictly_higher_confidence() {
        let mut registry = EntityRegistry::new("PMC1");
        let s0 = sentence(0, "INTRODUCTION");
        let s1 = sentence(1, "RESULTS");
        registry.observe("bone loss", "bone loss", EntityType::Phenotype, &s0, OffsetSpan::new(5, 14), 0.9);
        // equal confidence: anchor stays at the first mention
        registry.observe("bone loss", "Bone loss", EntityType::Phenotype, &s1, OffsetSpan::new(50, 59), 0.9);
        let entities = registry.into_entities();
        assert_eq!(entities[0].anchor.sentence_id, 0);
        assert_eq!(entities[0].anchor.char_start, 5);

        let mut registry = EntityRegistry::new("PMC1");
        registry.observe("bone loss", "bone loss", EntityType::Phenotype, &s0, OffsetSpan::new(5, 14), 0.6);
        registry.observe("bone loss", "Bone loss", EntityType::Phenotype, &s1, OffsetSpan::new(50, 59), 0.9);
        let entities = registry.into_entities();
        assert_eq!(entities[0].anchor.sentence_id, 1);
        assert_eq!(entities[0].anchor.anchor, "PMC1_50_59");
    }

    #[test]
    fn test_sections_accumulate_sorted() {
        let mut registry = EntityRegistry::new("PMC1");
        registry.observe("mouse", "mice", EntityType::Species, &sentence(0, "RESULTS"), OffsetSpan::new(0, 4), 0.9);
        registry.observe("mouse", "mouse", EntityType::Species, &sentence(1, "METHODS"), OffsetSpan::new(9, 14), 0.9);
        let entities = registry.into_entities();
        assert_eq!(entities[0].sections, vec!["METHODS", "RESULTS"]);
    }
}
