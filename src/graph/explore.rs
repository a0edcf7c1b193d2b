//! Graph queries
//!
//! The query facade over a compiled model graph: relationship-filtered
//! adjacency and reachability, component requirement closures, label and
//! display-name resolution, ancestor chain enumeration, and fuzzy search.
//!
//! Edge direction is read from the relationship registry, so a relationship
//! drawn dependency -> dependent ("in" direction) is queried through
//! incoming edges without callers knowing the convention.

use std::collections::{BTreeSet, HashMap, HashSet};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::algo::{all_simple_paths, has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::{ColumnType, ModelGraph};
use crate::error::{ModelError, Result};
use crate::labels::{class_label_from_display_name, property_label_from_display_name};
use crate::relations::{EdgeDirection, Relation};

/// A fuzzy search match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub label: String,
    pub display_name: String,
    pub score: i64,
}

impl ModelGraph {
    /// Direct neighbors of a node connected by one relationship, with the
    /// recorded edge weights.
    fn relation_neighbors(&self, idx: NodeIndex, relation: Relation) -> Vec<(NodeIndex, u32)> {
        let direction = match self.registry.descriptor(relation).edge {
            Some(EdgeDirection::In) => Direction::Incoming,
            _ => Direction::Outgoing,
        };
        self.graph
            .edges_directed(idx, direction)
            .filter(|e| e.weight().relation == relation)
            .map(|e| {
                let neighbor = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (neighbor, e.weight().weight)
            })
            .collect()
    }

    /// Direct neighbors of a node connected by one relationship. Empty set,
    /// not an error, for a node with no such edges.
    pub fn adjacent_nodes_by_relationship(
        &self,
        node: &str,
        relation: Relation,
    ) -> Result<BTreeSet<String>> {
        let idx = self.index_or_err(node)?;
        Ok(self
            .relation_neighbors(idx, relation)
            .into_iter()
            .map(|(n, _)| self.graph[n].clone())
            .collect())
    }

    /// Like [`adjacent_nodes_by_relationship`], but sorted by edge weight so
    /// the result matches the order the values were written in the source
    /// schema.
    ///
    /// [`adjacent_nodes_by_relationship`]: ModelGraph::adjacent_nodes_by_relationship
    pub fn adjacent_nodes_schema_ordered(
        &self,
        node: &str,
        relation: Relation,
    ) -> Result<Vec<String>> {
        let idx = self.index_or_err(node)?;
        let mut neighbors = self.relation_neighbors(idx, relation);
        neighbors.sort_by_key(|(_, weight)| *weight);
        let mut seen = HashSet::new();
        Ok(neighbors
            .into_iter()
            .filter(|(n, _)| seen.insert(*n))
            .map(|(n, _)| self.graph[n].clone())
            .collect())
    }

    /// A node's direct dependency attributes.
    ///
    /// With `schema_ordered`, dependencies come back in the author's written
    /// order (reconstructed from edge weights); otherwise in arbitrary
    /// traversal order. With `display_names`, labels are resolved to display
    /// names.
    pub fn node_dependencies(
        &self,
        node: &str,
        display_names: bool,
        schema_ordered: bool,
    ) -> Result<Vec<String>> {
        let labels = if schema_ordered {
            self.adjacent_nodes_schema_ordered(node, Relation::RequiresDependency)?
        } else {
            self.adjacent_nodes_by_relationship(node, Relation::RequiresDependency)?
                .into_iter()
                .collect()
        };
        if display_names {
            self.display_names_of(&labels)
        } else {
            Ok(labels)
        }
    }

    /// Nodes reachable from `source`, restricted to one relationship.
    ///
    /// Reachability is computed over the whole multigraph first; the induced
    /// subgraph is then restricted to edges of `relation` alone. Because
    /// pruning edges by relationship can disconnect nodes that were only
    /// reachable via mixed paths, `connected` further restricts the result
    /// to nodes still reachable from `source` inside the relationship-only
    /// subgraph. `ordered` returns the survivors in topological order of
    /// that subgraph and fails if it is cyclic. The source node itself is
    /// not part of the result.
    pub fn descendants_by_relationship(
        &self,
        source: &str,
        relation: Relation,
        connected: bool,
        ordered: bool,
    ) -> Result<Vec<String>> {
        let start = self.index_or_err(source)?;

        let mut reachable: HashSet<NodeIndex> = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            reachable.insert(idx);
        }

        // Relationship-only subgraph induced on the reachable set
        let mut sub: DiGraph<NodeIndex, ()> = DiGraph::new();
        let mut sub_indices: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for &idx in &reachable {
            let sub_idx = sub.add_node(idx);
            sub_indices.insert(idx, sub_idx);
        }
        for edge in self.graph.edge_references() {
            if edge.weight().relation != relation {
                continue;
            }
            if let (Some(&a), Some(&b)) =
                (sub_indices.get(&edge.source()), sub_indices.get(&edge.target()))
            {
                sub.update_edge(a, b, ());
            }
        }

        let survivors: HashSet<NodeIndex> = if connected {
            let mut connected_set = HashSet::new();
            let mut sub_dfs = Dfs::new(&sub, sub_indices[&start]);
            while let Some(idx) = sub_dfs.next(&sub) {
                connected_set.insert(idx);
            }
            connected_set
        } else {
            sub.node_indices().collect()
        };

        let ordering: Vec<NodeIndex> = if ordered {
            toposort(&sub, None)
                .map_err(|_| ModelError::CyclicRelationshipSubgraph(relation))?
        } else {
            sub.node_indices().collect()
        };

        Ok(ordering
            .into_iter()
            .filter(|idx| survivors.contains(idx) && sub[*idx] != start)
            .map(|idx| self.graph[sub[idx]].clone())
            .collect())
    }

    /// The closure of components a component transitively requires.
    pub fn component_requirements(&self, component: &str) -> Result<Vec<String>> {
        self.descendants_by_relationship(component, Relation::RequiresComponent, true, false)
    }

    /// Collapse the multigraph to a simple directed graph containing only
    /// edges of one relationship. Node weights are labels.
    pub fn digraph_by_edge_type(&self, relation: Relation) -> DiGraph<String, ()> {
        self.relation_digraph(relation).0
    }

    pub(crate) fn relation_digraph(
        &self,
        relation: Relation,
    ) -> (DiGraph<String, ()>, HashMap<String, NodeIndex>) {
        let mut digraph = DiGraph::with_capacity(self.graph.node_count(), 0);
        let mut indices = HashMap::with_capacity(self.graph.node_count());
        for idx in self.graph.node_indices() {
            let label = self.graph[idx].clone();
            let new_idx = digraph.add_node(label.clone());
            indices.insert(label, new_idx);
        }
        for edge in self.graph.edge_references() {
            if edge.weight().relation != relation {
                continue;
            }
            let a = indices[&self.graph[edge.source()]];
            let b = indices[&self.graph[edge.target()]];
            digraph.update_edge(a, b, ());
        }
        (digraph, indices)
    }

    /// Resolve a human-entered display name to a node label. Exact display
    /// names resolve through the index; otherwise the property transform is
    /// tried first, then the class transform, since callers rarely know up
    /// front which kind a name refers to.
    pub fn node_label_from_display_name(&self, display_name: &str) -> Result<String> {
        if let Some(label) = self.by_display_name.get(display_name) {
            return Ok(label.clone());
        }
        let property = property_label_from_display_name(display_name);
        if self.contains(&property) {
            return Ok(property);
        }
        let class = class_label_from_display_name(display_name);
        if self.contains(&class) {
            return Ok(class);
        }
        Err(ModelError::UnknownNode(display_name.to_string()))
    }

    /// Display name for a label.
    pub fn display_name_of(&self, label: &str) -> Result<&str> {
        Ok(self.node_or_err(label)?.display_name.as_str())
    }

    /// Display names for a list of labels, order preserved.
    pub fn display_names_of(&self, labels: &[String]) -> Result<Vec<String>> {
        labels
            .iter()
            .map(|label| self.display_name_of(label).map(|s| s.to_string()))
            .collect()
    }

    /// A node's description, defaulted to empty.
    pub fn node_comment(&self, label: &str) -> Result<&str> {
        Ok(self.node_or_err(label)?.comment.as_deref().unwrap_or(""))
    }

    /// A node's required flag, defaulted to false.
    pub fn node_is_required(&self, label: &str) -> Result<bool> {
        Ok(self.node_or_err(label)?.required.unwrap_or(false))
    }

    /// A node's validation rules, in declared order.
    pub fn node_validation_rules(&self, label: &str) -> Result<&[String]> {
        Ok(self
            .node_or_err(label)?
            .validation_rules
            .as_deref()
            .unwrap_or(&[]))
    }

    /// A node's declared column type, if any.
    pub fn node_column_type(&self, label: &str) -> Result<Option<ColumnType>> {
        Ok(self.node_or_err(label)?.column_type)
    }

    /// All ancestor chains of a node in the class hierarchy.
    ///
    /// Isolates the parent-of subgraph, locates its topological roots, and
    /// enumerates every simple path from a root down to the node. Each path
    /// (minus the node itself) is one ancestor chain; multiple inheritance
    /// yields multiple chains. Enumeration is capped at `max_paths` since
    /// densely connected hierarchies can make simple-path counts explode.
    pub fn find_parent_classes(&self, node: &str, max_paths: usize) -> Result<Vec<Vec<String>>> {
        let (sub, indices) = self.relation_digraph(Relation::ParentOf);
        let target = *indices
            .get(node)
            .ok_or_else(|| ModelError::UnknownNode(node.to_string()))?;

        let roots: Vec<NodeIndex> = sub
            .node_indices()
            .filter(|&idx| {
                idx != target
                    && sub.neighbors_directed(idx, Direction::Incoming).next().is_none()
                    && sub.neighbors_directed(idx, Direction::Outgoing).next().is_some()
            })
            .collect();

        let mut chains = Vec::new();
        for root in roots {
            if !has_path_connecting(&sub, root, target, None) {
                continue;
            }
            for path in all_simple_paths::<Vec<NodeIndex>, _>(&sub, root, target, 0, None) {
                if chains.len() >= max_paths {
                    return Err(ModelError::TooManyAncestorPaths {
                        node: node.to_string(),
                        limit: max_paths,
                    });
                }
                let chain: Vec<String> = path
                    .iter()
                    .take(path.len().saturating_sub(1))
                    .map(|&idx| sub[idx].clone())
                    .collect();
                if !chain.is_empty() {
                    chains.push(chain);
                }
            }
        }
        Ok(chains)
    }

    /// Fuzzy search over display names and labels.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let matcher = SkimMatcherV2::default();
        let mut hits: Vec<SearchHit> = self
            .nodes
            .values()
            .filter_map(|node| {
                let score = matcher
                    .fuzzy_match(&node.display_name, query)
                    .or_else(|| matcher.fuzzy_match(&node.label, query))?;
                Some(SearchHit {
                    label: node.label.clone(),
                    display_name: node.display_name.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.label.cmp(&b.label)));
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tabular;
    use crate::relations::RelationshipRegistry;

    const HEADER: &str = "Attribute,Description,Valid Values,DependsOn,Required,Parent,Properties,DependsOn Component,Source,Validation Rules,ColumnType";

    fn build(rows: &str) -> ModelGraph {
        let registry = RelationshipRegistry::new();
        let attributes =
            tabular::parse_reader(format!("{}\n{}", HEADER, rows).as_bytes(), &registry).unwrap();
        ModelGraph::build(&attributes, &registry).unwrap()
    }

    #[test]
    fn test_adjacent_nodes_empty_for_leaf() {
        let graph = build("Patient,,,Diagnosis,,,,,,,\nDiagnosis,,,,,,,,,,");
        let adjacent = graph
            .adjacent_nodes_by_relationship("Diagnosis", Relation::RequiresDependency)
            .unwrap();
        assert!(adjacent.is_empty());
    }

    #[test]
    fn test_adjacent_nodes_unknown_node() {
        let graph = build("Patient,,,,,,,,,,");
        assert!(matches!(
            graph.adjacent_nodes_by_relationship("Missing", Relation::RequiresDependency),
            Err(ModelError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_descendants_pruned_by_relationship() {
        // Patient -> Diagnosis via requiresDependency; Diagnosis -> Healthy
        // via rangeIncludes. Healthy is reachable in the whole graph but not
        // through requiresDependency edges.
        let graph = build("Patient,,,Diagnosis,,,,,,,\nDiagnosis,,Healthy,,,,,,,,");
        let connected = graph
            .descendants_by_relationship("Patient", Relation::RequiresDependency, true, false)
            .unwrap();
        assert_eq!(connected, vec!["Diagnosis".to_string()]);

        let unconnected = graph
            .descendants_by_relationship("Patient", Relation::RequiresDependency, false, false)
            .unwrap();
        assert!(unconnected.contains(&"Healthy".to_string()));
    }

    #[test]
    fn test_descendants_topological_order() {
        let graph = build(
            "A,,,B,,,,,,,\nB,,,C,,,,,,,\nC,,,,,,,,,,",
        );
        let ordered = graph
            .descendants_by_relationship("A", Relation::RequiresDependency, true, true)
            .unwrap();
        assert_eq!(ordered, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_component_requirements_closure() {
        let graph = build(
            "Biospecimen,,,,,,,Patient,,,\nPatient,,,,,,,Demographics,,,\nDemographics,,,,,,,,,,",
        );
        let requirements = graph.component_requirements("Biospecimen").unwrap();
        assert_eq!(requirements.len(), 2);
        assert!(requirements.contains(&"Patient".to_string()));
        assert!(requirements.contains(&"Demographics".to_string()));
    }

    #[test]
    fn test_schema_ordered_dependencies() {
        let graph = build("Patient,,,\"Zeta, Alpha, Mid\",,,,,,,");
        let ordered = graph.node_dependencies("Patient", false, true).unwrap();
        assert_eq!(
            ordered,
            vec!["Zeta".to_string(), "Alpha".to_string(), "Mid".to_string()]
        );
    }

    #[test]
    fn test_label_resolution_dual_try() {
        let graph = build("Patient,,,,,,Patient ID,,,,\nPatient ID,,,,,,,,,,");
        assert_eq!(
            graph.node_label_from_display_name("Patient ID").unwrap(),
            "patientID"
        );
        assert_eq!(graph.node_label_from_display_name("Patient").unwrap(), "Patient");
        assert!(matches!(
            graph.node_label_from_display_name("Absent"),
            Err(ModelError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_find_parent_classes_multiple_inheritance() {
        // Grandparent <- Parent <- Child, and Child also under Other
        let graph = build(
            "Grandparent,,,,,,,,,,\nParent,,,,,Grandparent,,,,,\nOther,,,,,,,,,,\nChild,,,,,\"Parent, Other\",,,,,",
        );
        let mut chains = graph.find_parent_classes("Child", 100).unwrap();
        chains.sort();
        assert_eq!(
            chains,
            vec![
                vec!["Grandparent".to_string(), "Parent".to_string()],
                vec!["Other".to_string()],
            ]
        );
    }

    #[test]
    fn test_find_parent_classes_path_cap() {
        let graph = build("Grandparent,,,,,,,,,,\nParent,,,,,Grandparent,,,,,\nChild,,,,,Parent,,,,,");
        assert!(matches!(
            graph.find_parent_classes("Child", 0),
            Err(ModelError::TooManyAncestorPaths { .. })
        ));
    }

    #[test]
    fn test_search_finds_display_name() {
        let graph = build("Year of Birth,,,,,,,,,,\nDiagnosis,,,,,,,,,,");
        let hits = graph.search("year birth", 5);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].label, "YearOfBirth");
    }
}
