//! Graph construction
//!
//! Two passes over the parsed attribute map, mirroring how the parser
//! collects rows first and resolves references second. The node pass creates
//! one node per attribute (including nodes that only ever appear as
//! referenced values) and attaches value-relationship attributes, applying
//! registry defaults where the document was silent. The edge pass resolves
//! every (attribute, relationship, reference) triple to labels and adds a
//! directed edge weighted by the value's list position.
//!
//! Self-loops are dropped: an attribute may not declare itself as its own
//! parent, dependency, or range value.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use petgraph::graph::DiGraph;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ColumnType, EntryKind, ModelGraph, NodeData, RelationEdge};
use crate::error::{ModelError, Result};
use crate::labels::{class_label_from_display_name, property_label_from_display_name};
use crate::parser::{AttributeMap, ParsedValue, RelationshipSet};
use crate::relations::{
    DefaultValue, EdgeDirection, Relation, RelationshipRegistry,
};

impl ModelGraph {
    /// Build a model graph from a parsed attribute map.
    pub fn build(attributes: &AttributeMap, registry: &RelationshipRegistry) -> Result<ModelGraph> {
        // Display names declared as some attribute's property
        let property_names: HashSet<&str> = attributes
            .iter()
            .filter_map(|(_, rels)| rels.get(Relation::DomainIncludes))
            .filter_map(|v| v.as_list())
            .flatten()
            .map(|s| s.as_str())
            .collect();

        let edge_relations: Vec<Relation> = registry
            .edge_relationships()
            .into_iter()
            .map(|(relation, _)| relation)
            .filter(|relation| *relation != Relation::ParentOf)
            .collect();

        // Gather every display name in first-seen order: each attribute,
        // then the references it declares. Referenced-only names become
        // nodes carrying registry defaults.
        let mut node_order: Vec<String> = Vec::with_capacity(attributes.len());
        let mut seen: HashSet<String> = HashSet::with_capacity(attributes.len());
        for (display_name, relationships) in attributes.iter() {
            if seen.insert(display_name.to_string()) {
                node_order.push(display_name.to_string());
            }
            for relation in &edge_relations {
                let Some(values) = relationships.get(*relation) else {
                    continue;
                };
                for referenced in list_of(values) {
                    if seen.insert(referenced.clone()) {
                        node_order.push(referenced);
                    }
                }
            }
        }

        let mut graph = DiGraph::with_capacity(node_order.len(), node_order.len() * 3);
        let mut nodes = HashMap::with_capacity(node_order.len());
        let mut node_indices = HashMap::with_capacity(node_order.len());
        let mut by_display_name = HashMap::with_capacity(node_order.len());

        // Node pass
        let empty = RelationshipSet::default();
        for display_name in &node_order {
            let relationships = attributes.get(display_name).unwrap_or(&empty);
            let kind = if property_names.contains(display_name.as_str()) {
                EntryKind::Property
            } else {
                EntryKind::Class
            };
            let node = make_node(display_name, relationships, kind, registry)?;

            let idx = graph.add_node(node.label.clone());
            node_indices.insert(node.label.clone(), idx);
            by_display_name.insert(display_name.clone(), node.label.clone());
            nodes.insert(node.label.clone(), node);
        }

        // Edge pass
        for (display_name, relationships) in attributes.iter() {
            let source_label = by_display_name[display_name].clone();
            for relation in &edge_relations {
                let Some(values) = relationships.get(*relation) else {
                    continue;
                };
                let direction = registry
                    .descriptor(*relation)
                    .edge
                    .expect("edge relation has a direction");
                for (position, referenced) in list_of(values).iter().enumerate() {
                    let target_label = by_display_name[referenced].clone();
                    if source_label == target_label {
                        debug!(
                            attribute = display_name,
                            relation = %relation,
                            "dropping self-referential relationship"
                        );
                        continue;
                    }
                    let weight = position as u32;
                    let (from, to) = match direction {
                        EdgeDirection::Out => (&source_label, &target_label),
                        EdgeDirection::In => (&target_label, &source_label),
                    };
                    graph.add_edge(
                        node_indices[from],
                        node_indices[to],
                        RelationEdge { relation: *relation, weight },
                    );

                    // parentOf companions: the class hierarchy and the
                    // valid-value relation both read as parent -> child.
                    let parent_of = match relation {
                        Relation::SubClassOf => Some((&target_label, &source_label)),
                        Relation::RangeIncludes => Some((&source_label, &target_label)),
                        _ => None,
                    };
                    if let Some((parent, child)) = parent_of {
                        graph.add_edge(
                            node_indices[parent],
                            node_indices[child],
                            RelationEdge { relation: Relation::ParentOf, weight },
                        );
                    }
                }
            }
        }

        let content_hash = hash_attributes(attributes);
        debug!(
            nodes = nodes.len(),
            edges = graph.edge_count(),
            "built model graph"
        );

        Ok(ModelGraph {
            graph,
            nodes,
            node_indices,
            by_display_name,
            registry: registry.clone(),
            content_hash,
        })
    }
}

fn make_node(
    display_name: &str,
    relationships: &RelationshipSet,
    kind: EntryKind,
    registry: &RelationshipRegistry,
) -> Result<NodeData> {
    let label = match kind {
        EntryKind::Class => class_label_from_display_name(display_name),
        EntryKind::Property => property_label_from_display_name(display_name),
    };

    let comment = relationships
        .get(Relation::Comment)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| default_string(registry, Relation::Comment));

    let required = relationships
        .get(Relation::Required)
        .and_then(|v| v.as_bool())
        .or_else(|| match registry.descriptor(Relation::Required).default {
            DefaultValue::False => Some(false),
            _ => None,
        });

    let validation_rules = relationships
        .get(Relation::ValidationRules)
        .and_then(|v| v.as_list())
        .map(|rules| rules.to_vec())
        .or_else(|| match registry.descriptor(Relation::ValidationRules).default {
            DefaultValue::EmptyList => Some(Vec::new()),
            _ => None,
        });

    let column_type = relationships
        .get(Relation::ColumnType)
        .and_then(|v| v.as_str())
        .map(|raw| {
            ColumnType::from_str(raw).map_err(|value| ModelError::UnsupportedColumnType {
                attribute: display_name.to_string(),
                value,
                allowed: crate::relations::COLUMN_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            })
        })
        .transpose()?;

    let source = relationships
        .get(Relation::Source)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(NodeData {
        label,
        display_name: display_name.to_string(),
        comment,
        required,
        column_type,
        validation_rules,
        kind,
        source,
    })
}

fn default_string(registry: &RelationshipRegistry, relation: Relation) -> Option<String> {
    match registry.descriptor(relation).default {
        DefaultValue::EmptyString => Some(String::new()),
        _ => None,
    }
}

/// A relationship value as a reference list: scalars become single-element
/// lists, booleans reference nothing.
fn list_of(value: &ParsedValue) -> Vec<String> {
    match value {
        ParsedValue::List(items) => items.clone(),
        ParsedValue::Str(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn hash_attributes(attributes: &AttributeMap) -> String {
    let mut hasher = Sha256::new();
    for (display_name, relationships) in attributes.iter() {
        hasher.update(display_name.as_bytes());
        hasher.update([0u8]);
        for (relation, value) in relationships.iter() {
            hasher.update(relation.name().as_bytes());
            match value {
                ParsedValue::Str(s) => hasher.update(s.as_bytes()),
                ParsedValue::Bool(b) => hasher.update([*b as u8]),
                ParsedValue::List(items) => {
                    for item in items {
                        hasher.update(item.as_bytes());
                        hasher.update([1u8]);
                    }
                }
            }
            hasher.update([0u8]);
        }
    }
    format!("{:x}", hasher.finalize())
}
