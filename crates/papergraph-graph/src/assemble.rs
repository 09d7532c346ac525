//! Graph Assembler (stage 5)
//!
//! Builds the in-memory document graph from the entity registry and the
//! relation list, assigns page numbers to navigation anchors when page
//! breaks are known, and computes aggregate statistics. The assembled
//! graph is the single source of truth; every view is a pure function
//! of it.

use std::collections::{BTreeMap, HashMap, HashSet};

use papergraph_core::{
    DocumentGraph, Entity, GraphStats, PageBreak, PipelineError, Relation, Result,
};
use petgraph::unionfind::UnionFind;
use tracing::info;

pub struct GraphAssembler;

impl GraphAssembler {
    /// Assemble the full document graph.
    ///
    /// Relations referencing an id outside the registry are an integrity
    /// error: the registry and the relation list come from the same run.
    pub fn assemble(
        document_id: &str,
        mut entities: Vec<Entity>,
        relations: Vec<Relation>,
        page_breaks: &[PageBreak],
    ) -> Result<DocumentGraph> {
        let known: HashSet<u32> = entities.iter().map(|e| e.id).collect();
        for r in &relations {
            if !known.contains(&r.source) {
                return Err(PipelineError::UnknownEntity(r.source));
            }
            if !known.contains(&r.target) {
                return Err(PipelineError::UnknownEntity(r.target));
            }
        }

        if !page_breaks.is_empty() {
            let mut points: Vec<PageBreak> = page_breaks.to_vec();
            points.sort_by_key(|p| p.offset);
            for entity in &mut entities {
                entity.anchor.page = Some(page_for_offset(&points, entity.anchor.char_start));
            }
        }

        entities.sort_by_key(|e| e.id);
        let mut relations = relations;
        relations.sort_by_key(|r| r.id);

        let stats = compute_stats(&entities, &relations);
        info!(
            document_id,
            nodes = stats.n_nodes,
            edges = stats.n_edges,
            components = stats.n_components,
            "graph assembled"
        );

        Ok(DocumentGraph {
            document_id: document_id.to_string(),
            nodes: entities,
            edges: relations,
            stats,
        })
    }
}

/// Distinct-partner degree for every node.
pub fn degree_map(entities: &[Entity], relations: &[Relation]) -> HashMap<u32, usize> {
    let mut partners: HashMap<u32, HashSet<u32>> = HashMap::new();
    for r in relations {
        if r.source == r.target {
            continue;
        }
        partners.entry(r.source).or_default().insert(r.target);
        partners.entry(r.target).or_default().insert(r.source);
    }
    entities
        .iter()
        .map(|e| (e.id, partners.get(&e.id).map_or(0, |p| p.len())))
        .collect()
}

/// Last page whose break offset is at or before `offset`.
fn page_for_offset(points: &[PageBreak], offset: usize) -> u32 {
    let mut page = points.first().map_or(1, |p| p.page);
    for p in points {
        if p.offset <= offset {
            page = p.page;
        } else {
            break;
        }
    }
    page
}

fn compute_stats(entities: &[Entity], relations: &[Relation]) -> GraphStats {
    let mut entity_types: BTreeMap<String, usize> = BTreeMap::new();
    for e in entities {
        *entity_types.entry(e.entity_type.as_str().to_string()).or_default() += 1;
    }
    let mut relation_types: BTreeMap<String, usize> = BTreeMap::new();
    for r in relations {
        *relation_types.entry(r.relation_type.as_str().to_string()).or_default() += 1;
    }

    let degrees = degree_map(entities, relations);
    let mut degree_values: Vec<usize> = entities.iter().map(|e| degrees[&e.id]).collect();
    degree_values.sort_unstable();
    let n = degree_values.len();
    let avg_degree = if n == 0 {
        0.0
    } else {
        degree_values.iter().sum::<usize>() as f64 / n as f64
    };
    let median_degree = if n == 0 {
        0.0
    } else if n % 2 == 1 {
        degree_values[n / 2] as f64
    } else {
        (degree_values[n / 2 - 1] + degree_values[n / 2]) as f64 / 2.0
    };
    let isolated_nodes = degree_values.iter().filter(|&&d| d == 0).count();

    let (n_components, largest_component) = component_stats(entities, relations);

    let with_trigger = relations.iter().filter(|r| r.trigger.is_some()).count();
    let relations_with_trigger_pct = if relations.is_empty() {
        0.0
    } else {
        with_trigger as f64 / relations.len() as f64 * 100.0
    };

    GraphStats {
        n_nodes: entities.len(),
        n_edges: relations.len(),
        entity_types,
        relation_types,
        n_components,
        largest_component,
        avg_degree,
        median_degree,
        isolated_nodes,
        relations_with_trigger_pct,
    }
}

fn component_stats(entities: &[Entity], relations: &[Relation]) -> (usize, usize) {
    if entities.is_empty() {
        return (0, 0);
    }
    let index_of: HashMap<u32, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id, i))
        .collect();
    let mut uf: UnionFind<usize> = UnionFind::new(entities.len());
    for r in relations {
        uf.union(index_of[&r.source], index_of[&r.target]);
    }
    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for i in 0..entities.len() {
        *sizes.entry(uf.find(i)).or_default() += 1;
    }
    let largest = sizes.values().copied().max().unwrap_or(0);
    (sizes.len(), largest)
}
