//! Schema model graph
//!
//! Primary data structure using petgraph: a directed multigraph with one
//! node per attribute and one edge per relationship instance, typed by
//! relationship and carrying the value's list position as a weight so that
//! author-intended ordering can be reconstructed later. HashMap indexes
//! provide fast label and display-name lookup.
//!
//! The graph is built wholesale from a parsed attribute map and treated as
//! immutable afterwards; schema edits rebuild the graph rather than patching
//! it while readers may be in flight.

pub mod build;
pub mod checks;
pub mod diagnostics;
pub mod explore;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

pub use checks::run_checks;
pub use diagnostics::{CheckCode, CheckItem, Diagnostics, Severity};
pub use explore::SearchHit;

use crate::error::{ModelError, Result};
use crate::relations::{Relation, RelationshipRegistry};

/// Whether a node entered the model as a class or a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Class,
    Property,
}

/// Manifest column types an attribute may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ColumnType {
    /// JSON Schema `type` keyword for this column type.
    pub fn json_type(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(ColumnType::String),
            "integer" => Ok(ColumnType::Integer),
            "number" => Ok(ColumnType::Number),
            "boolean" => Ok(ColumnType::Boolean),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.json_type())
    }
}

/// Node attributes for one class or property.
///
/// Fields parsed from the document are optional so the structural validator
/// can tell "absent" from "defaulted"; the builder fills registry defaults,
/// and the typed accessors on [`ModelGraph`] expose the defaulted view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    /// Unique, code-safe identifier derived from the display name
    pub label: String,
    pub display_name: String,
    pub comment: Option<String>,
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
    pub validation_rules: Option<Vec<String>>,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Edge payload: the relationship kind plus the value's position in the
/// source list (0 for scalar-valued relationships).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub relation: Relation,
    pub weight: u32,
}

/// The compiled model graph.
pub struct ModelGraph {
    /// Directed multigraph; parallel edges carry distinct relationships
    pub(crate) graph: DiGraph<String, RelationEdge>,

    /// Node attributes indexed by label
    pub(crate) nodes: HashMap<String, NodeData>,

    /// Index: label -> NodeIndex
    pub(crate) node_indices: HashMap<String, NodeIndex>,

    /// Index: display name -> label
    pub(crate) by_display_name: HashMap<String, String>,

    /// Relationship catalog handle shared with the explorer and validator
    pub(crate) registry: RelationshipRegistry,

    /// SHA-256 over the parsed attribute map, for downstream cache keying
    pub content_hash: String,
}

impl ModelGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.nodes.contains_key(label)
    }

    /// Node attributes by label.
    pub fn node(&self, label: &str) -> Option<&NodeData> {
        self.nodes.get(label)
    }

    pub(crate) fn node_or_err(&self, label: &str) -> Result<&NodeData> {
        self.nodes
            .get(label)
            .ok_or_else(|| ModelError::UnknownNode(label.to_string()))
    }

    pub(crate) fn index_or_err(&self, label: &str) -> Result<NodeIndex> {
        self.node_indices
            .get(label)
            .copied()
            .ok_or_else(|| ModelError::UnknownNode(label.to_string()))
    }

    /// All node labels, in graph insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(move |i| self.graph[i].as_str())
    }

    /// All nodes.
    pub fn all_nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.values()
    }

    pub fn registry(&self) -> &RelationshipRegistry {
        &self.registry
    }

    /// Serializable snapshot round-tripping the exact node/edge/weight
    /// structure.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes: Vec<NodeData> = self
            .graph
            .node_indices()
            .filter_map(|i| self.nodes.get(&self.graph[i]).cloned())
            .collect();
        let edges: Vec<SnapshotEdge> = self
            .graph
            .edge_references()
            .map(|e| SnapshotEdge {
                source: self.graph[e.source()].clone(),
                target: self.graph[e.target()].clone(),
                relation: e.weight().relation,
                weight: e.weight().weight,
            })
            .collect();
        GraphSnapshot {
            content_hash: self.content_hash.clone(),
            nodes,
            edges,
        }
    }

    /// Rebuild a graph from a snapshot.
    pub fn from_snapshot(snapshot: GraphSnapshot, registry: RelationshipRegistry) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(snapshot.nodes.len(), snapshot.edges.len());
        let mut nodes = HashMap::with_capacity(snapshot.nodes.len());
        let mut node_indices = HashMap::with_capacity(snapshot.nodes.len());
        let mut by_display_name = HashMap::with_capacity(snapshot.nodes.len());

        for node in snapshot.nodes {
            let idx = graph.add_node(node.label.clone());
            node_indices.insert(node.label.clone(), idx);
            by_display_name.insert(node.display_name.clone(), node.label.clone());
            nodes.insert(node.label.clone(), node);
        }
        for edge in snapshot.edges {
            let source = node_indices
                .get(&edge.source)
                .copied()
                .ok_or_else(|| ModelError::UnknownNode(edge.source.clone()))?;
            let target = node_indices
                .get(&edge.target)
                .copied()
                .ok_or_else(|| ModelError::UnknownNode(edge.target.clone()))?;
            graph.add_edge(
                source,
                target,
                RelationEdge {
                    relation: edge.relation,
                    weight: edge.weight,
                },
            );
        }

        Ok(ModelGraph {
            graph,
            nodes,
            node_indices,
            by_display_name,
            registry,
            content_hash: snapshot.content_hash,
        })
    }
}

/// Opaque serialized form of a compiled graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub content_hash: String,
    pub nodes: Vec<NodeData>,
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub source: String,
    pub target: String,
    pub relation: Relation,
    pub weight: u32,
}
