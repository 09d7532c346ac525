//! Subgraph Reducer (stage 6)
//!
//! Derives size-bounded views from the assembled graph: one overview for
//! the whole document and one view per section. Every view honors a hard
//! node budget, contains only edges between selected nodes, and is
//! connected whenever the selection has any edge at all.
//!
//! Node ranking is global and fixed per document: distinct-partner degree
//! descending, then mention frequency descending, then id ascending. The
//! same candidate set and budget therefore always produce the same view.

use std::collections::{BTreeSet, HashMap, HashSet};

use papergraph_core::{
    DocumentGraph, Entity, GraphEdge, GraphNode, Relation, ReducerConfig, SectionIndexEntry,
    SubgraphView,
};
use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::assemble::degree_map;

pub struct SubgraphReducer<'a> {
    graph: &'a DocumentGraph,
    config: ReducerConfig,
    /// Global rank per node id; lower is better.
    rank: HashMap<u32, usize>,
}

impl<'a> SubgraphReducer<'a> {
    pub fn new(graph: &'a DocumentGraph, config: &ReducerConfig) -> Self {
        let degrees = degree_map(&graph.nodes, &graph.edges);
        let mut order: Vec<&Entity> = graph.nodes.iter().collect();
        order.sort_by(|a, b| {
            degrees[&b.id]
                .cmp(&degrees[&a.id])
                .then(b.frequency.cmp(&a.frequency))
                .then(a.id.cmp(&b.id))
        });
        let rank = order.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
        Self {
            graph,
            config: config.clone(),
            rank,
        }
    }

    /// Whole-document overview under the configured budget.
    pub fn overview(&self) -> SubgraphView {
        let candidates: Vec<&Entity> = self.graph.nodes.iter().collect();
        self.reduce("overview", None, candidates, self.config.overview_budget)
    }

    /// View for one section: candidates are the nodes anchored there.
    pub fn section_view(&self, heading: &str) -> SubgraphView {
        let candidates: Vec<&Entity> = self
            .graph
            .nodes
            .iter()
            .filter(|e| e.anchor.section == heading)
            .collect();
        self.reduce(heading, Some(heading), candidates, self.config.section_budget)
    }

    /// Views for every section that contributes a node anchor or an edge,
    /// in sorted heading order.
    pub fn section_views(&self) -> Vec<SubgraphView> {
        self.section_headings()
            .iter()
            .map(|heading| self.section_view(heading))
            .collect()
    }

    /// Navigation index: one entry per section, with its evidenced
    /// relation count and first page.
    pub fn section_index(&self) -> Vec<SectionIndexEntry> {
        self.section_headings()
            .iter()
            .map(|heading| {
                let relation_count = self
                    .graph
                    .edges
                    .iter()
                    .filter(|r| &r.section_heading == heading)
                    .count();
                let page = self
                    .graph
                    .nodes
                    .iter()
                    .filter(|e| &e.anchor.section == heading)
                    .filter_map(|e| e.anchor.page)
                    .min();
                SectionIndexEntry {
                    section: heading.clone(),
                    relation_count,
                    page,
                }
            })
            .collect()
    }

    fn section_headings(&self) -> Vec<String> {
        let mut headings: BTreeSet<String> = self
            .graph
            .nodes
            .iter()
            .map(|e| e.anchor.section.clone())
            .collect();
        headings.extend(self.graph.edges.iter().map(|r| r.section_heading.clone()));
        headings.into_iter().collect()
    }

    /// Reduce a candidate set to a budgeted, connected view.
    ///
    /// Selection keeps the top `budget` candidates by global rank, induces
    /// the edges among them, and when any edge survives drops every
    /// component but the largest (ties go to the component holding the
    /// best-ranked node). An edgeless selection is kept whole.
    fn reduce(
        &self,
        name: &str,
        section: Option<&str>,
        mut candidates: Vec<&Entity>,
        budget: usize,
    ) -> SubgraphView {
        candidates.sort_by_key(|e| self.rank[&e.id]);
        candidates.truncate(budget);

        let mut selected: Vec<&Entity> = candidates;
        let mut edges = self.induce(&selected);

        if !edges.is_empty() {
            let keep = self.largest_component(&selected, &edges);
            if keep.len() < selected.len() {
                selected.retain(|e| keep.contains(&e.id));
                edges = self.induce(&selected);
            }
        }

        let page = selected.iter().filter_map(|e| e.anchor.page).min();
        debug!(
            name,
            budget,
            n_nodes = selected.len(),
            n_edges = edges.len(),
            "view reduced"
        );

        SubgraphView {
            document_id: self.graph.document_id.clone(),
            name: name.to_string(),
            section: section.map(str::to_string),
            budget,
            n_nodes: selected.len(),
            n_edges: edges.len(),
            nodes: selected.iter().map(|e| GraphNode::from(*e)).collect(),
            edges: edges.iter().map(|r| GraphEdge::from(*r)).collect(),
            page,
        }
    }

    /// Edges with both endpoints in the selection, in id order.
    fn induce(&self, selected: &[&Entity]) -> Vec<&'a Relation> {
        let ids: HashSet<u32> = selected.iter().map(|e| e.id).collect();
        self.graph
            .edges
            .iter()
            .filter(|r| ids.contains(&r.source) && ids.contains(&r.target))
            .collect()
    }

    /// Node ids of the component to keep: largest, ties broken toward the
    /// component containing the best-ranked selected node.
    fn largest_component(&self, selected: &[&Entity], edges: &[&Relation]) -> HashSet<u32> {
        let index_of: HashMap<u32, usize> = selected
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        let mut uf: UnionFind<usize> = UnionFind::new(selected.len());
        for r in edges {
            uf.union(index_of[&r.source], index_of[&r.target]);
        }

        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for i in 0..selected.len() {
            *sizes.entry(uf.find(i)).or_default() += 1;
        }

        let mut best_root = None;
        let mut best: (usize, usize) = (0, usize::MAX);
        for (i, e) in selected.iter().enumerate() {
            let root = uf.find(i);
            let key = (sizes[&root], self.rank[&e.id]);
            let better = match best_root {
                None => true,
                Some(_) => key.0 > best.0 || (key.0 == best.0 && key.1 < best.1),
            };
            if better {
                best_root = Some(root);
                best = key;
            }
        }

        let Some(root) = best_root else {
            return selected.iter().map(|e| e.id).collect();
        };
        selected
            .iter()
            .enumerate()
            .filter(|(i, _)| uf.find(*i) == root)
            .map(|(_, e)| e.id)
            .collect()
    }
}

/// File-name-safe slug for a section heading.
pub fn slugify(heading: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(heading.len());
    let mut last_dash = true;
    for c in heading.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(max_len);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::tests::{entity, relation};
    use crate::assemble::GraphAssembler;
    use papergraph_core::{EntityType, NavAnchor, OffsetSpan, RelationType};

    fn config(overview: usize, section: usize) -> ReducerConfig {
        ReducerConfig {
            overview_budget: overview,
            section_budget: section,
            slug_max_len: 40,
        }
    }

    fn graph(entities: Vec<papergraph_core::Entity>, relations: Vec<papergraph_core::Relation>) -> DocumentGraph {
        GraphAssembler::assemble("PMC1", entities, relations, &[]).unwrap()
    }

    #[test]
    fn test_path_budget_two_stays_connected() {
        // A - B - C, budget 2: B ranks first, the kept pair must share an edge
        let entities = vec![
            entity(0, "a", EntityType::Gene, 1, 0),
            entity(1, "b", EntityType::Gene, 1, 10),
            entity(2, "c", EntityType::Gene, 1, 20),
        ];
        let relations = vec![
            relation(0, 0, 1, RelationType::CoOccurs),
            relation(1, 1, 2, RelationType::CoOccurs),
        ];
        let g = graph(entities, relations);
        let reducer = SubgraphReducer::new(&g, &config(2, 40));
        let view = reducer.overview();
        assert_eq!(view.n_nodes, 2);
        assert_eq!(view.n_edges, 1);
        let ids: HashSet<u32> = view.nodes.iter().map(|n| n.id).collect();
        assert!(ids.contains(&1), "the middle node must survive");
        assert!(ids == HashSet::from([0, 1]) || ids == HashSet::from([1, 2]));
    }

    #[test]
    fn test_hub_always_included() {
        // node 9 touches six others; with budget 5 it must be kept
        let entities: Vec<_> = (0..10)
            .map(|i| entity(i, &format!("n{i}"), EntityType::Process, 1, i as usize * 10))
            .collect();
        let mut relations: Vec<_> = (0..6)
            .map(|i| relation(i, 9, i, RelationType::CoOccurs))
            .collect();
        relations.push(relation(6, 6, 7, RelationType::CoOccurs));
        let g = graph(entities, relations);
        let reducer = SubgraphReducer::new(&g, &config(5, 40));
        let view = reducer.overview();
        assert_eq!(view.n_nodes, 5);
        assert!(view.nodes.iter().any(|n| n.id == 9));
        // every kept edge has both endpoints kept
        let ids: HashSet<u32> = view.nodes.iter().map(|n| n.id).collect();
        for e in &view.edges {
            assert!(ids.contains(&e.source) && ids.contains(&e.target));
        }
    }

    #[test]
    fn test_smaller_component_dropped() {
        // component {0,1,2} vs {3,4}: only the larger one survives
        let entities: Vec<_> = (0..5)
            .map(|i| entity(i, &format!("n{i}"), EntityType::Gene, 1, i as usize * 10))
            .collect();
        let relations = vec![
            relation(0, 0, 1, RelationType::CoOccurs),
            relation(1, 1, 2, RelationType::CoOccurs),
            relation(2, 3, 4, RelationType::CoOccurs),
        ];
        let g = graph(entities, relations);
        let reducer = SubgraphReducer::new(&g, &config(40, 40));
        let view = reducer.overview();
        let ids: HashSet<u32> = view.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, HashSet::from([0, 1, 2]));
        assert_eq!(view.n_edges, 2);
    }

    #[test]
    fn test_component_tie_goes_to_best_ranked() {
        // two 2-node components; node 2 has higher frequency so its
        // component wins the tie
        let entities = vec![
            entity(0, "a", EntityType::Gene, 1, 0),
            entity(1, "b", EntityType::Gene, 1, 10),
            entity(2, "c", EntityType::Gene, 5, 20),
            entity(3, "d", EntityType::Gene, 1, 30),
        ];
        let relations = vec![
            relation(0, 0, 1, RelationType::CoOccurs),
            relation(1, 2, 3, RelationType::CoOccurs),
        ];
        let g = graph(entities, relations);
        let reducer = SubgraphReducer::new(&g, &config(40, 40));
        let view = reducer.overview();
        let ids: HashSet<u32> = view.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, HashSet::from([2, 3]));
    }

    #[test]
    fn test_edgeless_selection_kept_whole() {
        let entities = vec![
            entity(0, "a", EntityType::Gene, 2, 0),
            entity(1, "b", EntityType::Gene, 1, 10),
        ];
        let g = graph(entities, vec![]);
        let reducer = SubgraphReducer::new(&g, &config(40, 40));
        let view = reducer.overview();
        assert_eq!(view.n_nodes, 2);
        assert_eq!(view.n_edges, 0);
    }

    #[test]
    fn test_empty_graph_gives_empty_view() {
        let g = graph(vec![], vec![]);
        let reducer = SubgraphReducer::new(&g, &config(40, 40));
        let view = reducer.overview();
        assert_eq!(view.n_nodes, 0);
        assert_eq!(view.n_edges, 0);
        assert!(view.page.is_none());
        assert!(reducer.section_views().is_empty());
    }

    #[test]
    fn test_determinism() {
        let entities: Vec<_> = (0..8)
            .map(|i| entity(i, &format!("n{i}"), EntityType::Process, 1, i as usize * 10))
            .collect();
        let relations = vec![
            relation(0, 0, 1, RelationType::CoOccurs),
            relation(1, 2, 3, RelationType::Regulates),
            relation(2, 4, 5, RelationType::CoOccurs),
            relation(3, 1, 2, RelationType::CoOccurs),
        ];
        let g = graph(entities, relations);
        let reducer = SubgraphReducer::new(&g, &config(4, 40));
        let first: Vec<u32> = reducer.overview().nodes.iter().map(|n| n.id).collect();
        let second: Vec<u32> = reducer.overview().nodes.iter().map(|n| n.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_section_views_and_index() {
        let mut a = entity(0, "a", EntityType::Gene, 1, 0);
        a.anchor = NavAnchor::new("PMC1", "INTRODUCTION", 0, OffsetSpan::new(0, 1));
        a.anchor.page = Some(1);
        let mut b = entity(1, "b", EntityType::Gene, 1, 10);
        b.anchor.page = Some(3);
        let c = entity(2, "c", EntityType::Process, 1, 20);
        let mut r = relation(0, 1, 2, RelationType::Activates);
        r.section_heading = "RESULTS".to_string();
        let g = graph(vec![a, b, c], vec![r]);
        let reducer = SubgraphReducer::new(&g, &config(40, 40));

        let views = reducer.section_views();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name, "INTRODUCTION");
        assert_eq!(views[0].n_nodes, 1);
        assert_eq!(views[0].page, Some(1));
        assert_eq!(views[1].name, "RESULTS");
        assert_eq!(views[1].n_nodes, 2);
        assert_eq!(views[1].n_edges, 1);
        assert_eq!(views[1].section.as_deref(), Some("RESULTS"));

        let index = reducer.section_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].section, "INTRODUCTION");
        assert_eq!(index[0].relation_count, 0);
        assert_eq!(index[1].relation_count, 1);
        assert_eq!(index[1].page, Some(3));
    }

    #[test]
    fn test_section_budget_applies() {
        let entities: Vec<_> = (0..6)
            .map(|i| entity(i, &format!("n{i}"), EntityType::Gene, 1, i as usize * 10))
            .collect();
        let relations: Vec<_> = (0..5)
            .map(|i| {
                let mut r = relation(i, i, i + 1, RelationType::CoOccurs);
                r.section_heading = "RESULTS".to_string();
                r
            })
            .collect();
        let g = graph(entities, relations);
        let reducer = SubgraphReducer::new(&g, &config(40, 3));
        let view = reducer.section_view("RESULTS");
        assert!(view.n_nodes <= 3);
        let ids: HashSet<u32> = view.nodes.iter().map(|n| n.id).collect();
        for e in &view.edges {
            assert!(ids.contains(&e.source) && ids.contains(&e.target));
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("MATERIALS AND METHODS", 40), "materials-and-methods");
        assert_eq!(slugify("Results & Discussion!", 40), "results-discussion");
        assert_eq!(slugify("---", 40), "section");
        assert_eq!(slugify("a very long heading that keeps going on", 10), "a-very-lon");
    }
}
