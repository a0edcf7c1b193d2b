//! Linked-data (JSON-LD) model parsing
//!
//! Decompiles a linked-data graph document back into the normalized
//! attribute map. Records live in the top-level `@graph` array and are keyed
//! by compact-URI document keys. Reference values carry a context prefix
//! ("bts:Patient") which is stripped; single-key objects and object lists
//! are reduced to their id references.
//!
//! The `domainIncludes` relationship is stored in the document in the
//! reverse direction from the internal model (the property record lists the
//! classes that use it), so it is inverted at parse time onto the referenced
//! class's entry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use super::{AttributeMap, ParsedValue};
use crate::error::{ModelError, Result};
use crate::relations::{Relation, RelationshipRegistry, ValueShape};

const GRAPH_KEY: &str = "@graph";
const ID_KEY: &str = "@id";
const LABEL_KEY: &str = "rdfs:label";

/// Parse a linked-data model document from a file path.
pub fn parse_file(path: &Path, registry: &RelationshipRegistry) -> Result<AttributeMap> {
    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    parse_document(&document, registry)
}

/// Parse a linked-data model document already loaded as JSON.
pub fn parse_document(document: &Value, registry: &RelationshipRegistry) -> Result<AttributeMap> {
    warn!("linked-data model parsing is best-effort; inspect the compiled graph for fidelity");

    let records = document
        .get(GRAPH_KEY)
        .and_then(|g| g.as_array())
        .ok_or_else(|| {
            ModelError::MalformedDocument(format!("missing top-level '{}' array", GRAPH_KEY))
        })?;

    let mut attributes = AttributeMap::new();
    // domainIncludes inversions resolved after all records are known:
    // (referenced class id, property display name)
    let mut pending_domains: Vec<(String, String)> = Vec::new();
    // label/id -> display name, for rewriting references after the pass
    let mut label_to_display: HashMap<String, String> = HashMap::new();

    for record in records {
        let Some(display_name) = record_display_name(record, registry) else {
            continue;
        };
        for key in [LABEL_KEY, ID_KEY] {
            if let Some(reference) = record.get(key).and_then(|v| v.as_str()) {
                label_to_display
                    .insert(strip_context_prefix(reference).to_string(), display_name.clone());
            }
        }

        let relationships = attributes.entry(&display_name);
        for descriptor in registry.parsed_descriptors() {
            if descriptor.relation == Relation::DisplayName {
                continue;
            }
            let Some(raw) = record.get(descriptor.document_key) else {
                continue;
            };

            if descriptor.relation == Relation::DomainIncludes {
                for class_ref in reference_list(raw) {
                    pending_domains.push((class_ref, display_name.clone()));
                }
                continue;
            }

            let value = match descriptor.shape {
                ValueShape::Bool => ParsedValue::Bool(bool_value(raw)),
                ValueShape::List => ParsedValue::List(reference_list(raw)),
                ValueShape::Scalar => ParsedValue::Str(scalar_value(raw)),
            };
            relationships.set(descriptor.relation, value);
        }
    }

    // References in the document name records by label; the normalized map
    // references attributes by display name, like the tabular variant.
    rewrite_references(&mut attributes, &label_to_display, registry);

    for (class_ref, property_name) in pending_domains {
        let class_name = label_to_display
            .get(class_ref.as_str())
            .cloned()
            .unwrap_or(class_ref);
        attributes
            .entry(&class_name)
            .push_list_value(Relation::DomainIncludes, property_name);
    }

    debug!(attributes = attributes.len(), "parsed linked-data model");
    Ok(attributes)
}

fn rewrite_references(
    attributes: &mut AttributeMap,
    label_to_display: &HashMap<String, String>,
    registry: &RelationshipRegistry,
) {
    let list_edge_relations: Vec<Relation> = registry
        .parsed_descriptors()
        .filter(|d| d.edge.is_some() && d.shape == ValueShape::List)
        .map(|d| d.relation)
        .collect();
    let names: Vec<String> = attributes.iter().map(|(n, _)| n.to_string()).collect();

    for name in names {
        let relationships = attributes.entry(&name);
        for relation in &list_edge_relations {
            let Some(items) = relationships.get(*relation).and_then(|v| v.as_list()) else {
                continue;
            };
            let resolved: Vec<String> = items
                .iter()
                .map(|item| {
                    label_to_display
                        .get(item.as_str())
                        .cloned()
                        .unwrap_or_else(|| item.clone())
                })
                .collect();
            relationships.set(*relation, ParsedValue::List(resolved));
        }
    }
}

/// A record's display name, falling back to its label when no explicit
/// display-name key exists.
fn record_display_name(record: &Value, registry: &RelationshipRegistry) -> Option<String> {
    let display_key = registry.descriptor(Relation::DisplayName).document_key;
    record
        .get(display_key)
        .or_else(|| record.get(LABEL_KEY))
        .and_then(|v| v.as_str())
        .map(|s| strip_context_prefix(s).to_string())
}

/// Reduce a reference value to a list of id references.
fn reference_list(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items.iter().filter_map(single_reference).collect(),
        other => single_reference(other).into_iter().collect(),
    }
}

fn single_reference(raw: &Value) -> Option<String> {
    match raw {
        Value::Object(map) => map
            .get(ID_KEY)
            .or_else(|| map.values().next())
            .and_then(|v| v.as_str())
            .map(|s| strip_context_prefix(s).to_string()),
        Value::String(s) => Some(strip_context_prefix(s).to_string()),
        _ => None,
    }
}

fn scalar_value(raw: &Value) -> String {
    match raw {
        Value::Object(map) => map
            .get(ID_KEY)
            .or_else(|| map.values().next())
            .and_then(|v| v.as_str())
            .map(|s| strip_context_prefix(s).to_string())
            .unwrap_or_default(),
        Value::String(s) => strip_context_prefix(s).to_string(),
        other => other.to_string(),
    }
}

fn bool_value(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => strip_context_prefix(s.trim()).eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Strip a compact-URI context prefix ("bts:Patient" -> "Patient"). Full
/// URIs are left alone.
fn strip_context_prefix(s: &str) -> &str {
    match s.split_once(':') {
        Some((prefix, rest))
            if !prefix.contains('/') && !rest.starts_with("//") && !rest.is_empty() =>
        {
            rest
        }
        _ => s,
    }
}
