//! Tabular (CSV) model parsing
//!
//! The header row must be a superset of the registry's required headers.
//! Each relationship-bearing cell is coerced according to the descriptor's
//! declared shape: list cells split on comma with order preserved, boolean
//! cells coerced from true/false tokens, scalar cells trimmed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use super::{AttributeMap, ParsedValue};
use crate::error::{ModelError, Result};
use crate::relations::{
    Relation, RelationshipRegistry, ValueShape, DEPRECATED_HEADERS,
};

/// Parse a tabular model document from a file path.
pub fn parse_file(path: &Path, registry: &RelationshipRegistry) -> Result<AttributeMap> {
    let file = File::open(path)?;
    parse_reader(file, registry)
}

/// Parse a tabular model document from any reader.
pub fn parse_reader<R: Read>(reader: R, registry: &RelationshipRegistry) -> Result<AttributeMap> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    validate_headers(&headers, registry)?;

    // (relation, column index) for every descriptor whose header is present
    let columns: Vec<(Relation, usize)> = registry
        .parsed_descriptors()
        .filter_map(|d| {
            let header = d.header?;
            headers.iter().position(|h| h == header).map(|i| (d.relation, i))
        })
        .collect();
    let display_header = registry
        .descriptor(Relation::DisplayName)
        .header
        .expect("display name is tabular-representable");
    let attribute_column = headers
        .iter()
        .position(|h| h == display_header)
        .expect("presence validated above");

    let mut attributes = AttributeMap::new();

    for record in csv_reader.records() {
        let record = record?;
        let display_name = record.get(attribute_column).unwrap_or("").trim();
        if display_name.is_empty() {
            continue;
        }

        let relationships = attributes.entry(display_name);
        for &(relation, column) in &columns {
            if relation == Relation::DisplayName {
                continue;
            }
            let raw = record.get(column).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let descriptor = registry.descriptor(relation);
            let value = match descriptor.shape {
                ValueShape::Bool => ParsedValue::Bool(parse_bool(raw, display_name, relation)),
                ValueShape::List => ParsedValue::List(split_list(raw)),
                ValueShape::Scalar => {
                    if let Some(allowed) = descriptor.allowed_values {
                        if !allowed.contains(&raw) {
                            return Err(ModelError::UnsupportedColumnType {
                                attribute: display_name.to_string(),
                                value: raw.to_string(),
                                allowed: allowed.iter().map(|s| s.to_string()).collect(),
                            });
                        }
                    }
                    ParsedValue::Str(raw.to_string())
                }
            };
            relationships.set(relation, value);
        }
    }

    debug!(attributes = attributes.len(), "parsed tabular model");
    Ok(attributes)
}

fn validate_headers(headers: &[String], registry: &RelationshipRegistry) -> Result<()> {
    let missing: Vec<String> = registry
        .required_headers()
        .into_iter()
        .filter(|required| !headers.iter().any(|h| h == required))
        .map(|h| h.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    // A deprecated header explains the gap better than a generic report.
    for (old, new) in DEPRECATED_HEADERS {
        if headers.iter().any(|h| h == old) && missing.iter().any(|m| m == new) {
            return Err(ModelError::DeprecatedHeader {
                found: old.to_string(),
                replacement: new.to_string(),
            });
        }
    }

    Err(ModelError::MissingHeaders { missing })
}

/// Comma-separated list: tokens trimmed, empty tokens dropped, order kept.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

fn parse_bool(raw: &str, attribute: &str, relation: Relation) -> bool {
    match raw.to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => {
            warn!(
                attribute,
                relation = %relation,
                value = other,
                "unrecognized boolean cell, treating as false"
            );
            false
        }
    }
}
