//! Schema document parsing
//!
//! Two parser variants (tabular and linked-data) produce the same normalized
//! shape: an insertion-ordered mapping from attribute display name to the
//! relationship values declared for it. Values are tagged by the shape the
//! relationship descriptor declares, so a malformed cell is a typed parse
//! error rather than silent misbehavior.

pub mod jsonld;
pub mod tabular;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{ModelError, Result};
use crate::relations::{Relation, RelationshipRegistry};

/// A parsed relationship value, tagged by declared shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedValue {
    Str(String),
    List(Vec<String>),
    Bool(bool),
}

impl ParsedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParsedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParsedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParsedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// The relationships declared for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipSet {
    values: BTreeMap<Relation, ParsedValue>,
}

impl RelationshipSet {
    pub fn get(&self, relation: Relation) -> Option<&ParsedValue> {
        self.values.get(&relation)
    }

    pub fn set(&mut self, relation: Relation, value: ParsedValue) {
        self.values.insert(relation, value);
    }

    /// Append to a list-shaped relationship, creating it if absent. Used by
    /// the linked-data parser's domain inversion.
    pub fn push_list_value(&mut self, relation: Relation, value: String) {
        match self.values.entry(relation).or_insert_with(|| ParsedValue::List(Vec::new())) {
            ParsedValue::List(items) => {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            other => *other = ParsedValue::List(vec![value]),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Relation, &ParsedValue)> {
        self.values.iter().map(|(r, v)| (*r, v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Normalized parse result: display name -> relationship set, preserving the
/// order attributes appear in the source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    order: Vec<String>,
    by_name: HashMap<String, RelationshipSet>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relationship set for a display name, created empty on first use.
    pub fn entry(&mut self, display_name: &str) -> &mut RelationshipSet {
        if !self.by_name.contains_key(display_name) {
            self.order.push(display_name.to_string());
            self.by_name.insert(display_name.to_string(), RelationshipSet::default());
        }
        self.by_name.get_mut(display_name).expect("inserted above")
    }

    pub fn get(&self, display_name: &str) -> Option<&RelationshipSet> {
        self.by_name.get(display_name)
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.by_name.contains_key(display_name)
    }

    /// Attributes in source-document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipSet)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), &self.by_name[name]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Parse a model document, selecting the parser variant by file extension.
pub fn parse_model(path: &Path, registry: &RelationshipRegistry) -> Result<AttributeMap> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => tabular::parse_file(path, registry),
        "jsonld" | "json" => jsonld::parse_file(path, registry),
        other => Err(ModelError::UnknownFormat(format!(
            "'{}' (expected .csv, .json, or .jsonld)",
            other
        ))),
    }
}
