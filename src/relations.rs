//! Relationship catalog
//!
//! The single source of truth for relationship semantics. Every relationship
//! used during parsing and graph construction has a descriptor here: its
//! serialized document key, its tabular column header, the shape its values
//! take, and (for edge relationships) the direction the edge is drawn in.
//! Components consult the registry instead of hard-coding any of this.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ModelError, Result};

/// Relationship kinds understood by the model compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Human-readable attribute name; also the key of the parsed map
    DisplayName,
    /// Free-text description
    Comment,
    /// Valid values (the attribute's enum range)
    RangeIncludes,
    /// Attributes that become relevant once this attribute is in use
    RequiresDependency,
    /// Components a component transitively requires
    RequiresComponent,
    /// Unconditionally required flag
    Required,
    /// Class hierarchy parent
    SubClassOf,
    /// Ordered validation-rule strings
    ValidationRules,
    /// Which classes use this record as a property
    DomainIncludes,
    /// Provenance reference
    Source,
    /// Manifest column type
    ColumnType,
    /// Synthetic parent-of edge; derived from SubClassOf and RangeIncludes,
    /// never parsed from a document
    ParentOf,
}

impl Relation {
    /// Internal key, as used in error messages and CLI arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Relation::DisplayName => "displayName",
            Relation::Comment => "comment",
            Relation::RangeIncludes => "rangeIncludes",
            Relation::RequiresDependency => "requiresDependency",
            Relation::RequiresComponent => "requiresComponent",
            Relation::Required => "required",
            Relation::SubClassOf => "subClassOf",
            Relation::ValidationRules => "validationRules",
            Relation::DomainIncludes => "domainIncludes",
            Relation::Source => "source",
            Relation::ColumnType => "columnType",
            Relation::ParentOf => "parentOf",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shape a relationship's parsed value takes. Parsers dispatch on this tag
/// rather than inspecting the runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueShape {
    Scalar,
    List,
    Bool,
}

/// Direction convention for edge relationships.
///
/// `Out`: the edge is drawn from the declaring attribute to the referenced
/// node. `In`: the edge is drawn from the referenced node to the declaring
/// attribute (dependency -> dependent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeDirection {
    Out,
    In,
}

/// Default applied when a relationship is absent from the parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    None,
    EmptyString,
    EmptyList,
    False,
}

/// Static description of one relationship kind.
#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    pub relation: Relation,
    /// Compact-URI-style key in linked-data documents
    pub document_key: &'static str,
    /// Tabular column header, if the relationship is tabular-representable
    pub header: Option<&'static str>,
    /// Whether the header must be present for a tabular document to parse
    pub required_header: bool,
    pub shape: ValueShape,
    pub default: DefaultValue,
    /// Some(..) iff the relationship forms a graph edge
    pub edge: Option<EdgeDirection>,
    /// Whether every node must carry this value after graph construction
    pub node_field: bool,
    /// Restriction on accepted values, if any
    pub allowed_values: Option<&'static [&'static str]>,
    /// Synthetic relationships are produced by the graph builder and are
    /// never looked for in input documents
    pub synthetic: bool,
}

/// Column types accepted by the `ColumnType` relationship.
pub const COLUMN_TYPES: &[&str] = &["string", "integer", "number", "boolean"];

/// Deprecated tabular headers and their current replacements. Used to give a
/// targeted error instead of a generic missing-header one.
pub const DEPRECATED_HEADERS: &[(&str, &str)] = &[
    ("Requires", "DependsOn"),
    ("Requires Component", "DependsOn Component"),
];

const DESCRIPTORS: &[RelationshipDescriptor] = &[
    RelationshipDescriptor {
        relation: Relation::DisplayName,
        document_key: "sms:displayName",
        header: Some("Attribute"),
        required_header: true,
        shape: ValueShape::Scalar,
        default: DefaultValue::None,
        edge: None,
        node_field: true,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::Comment,
        document_key: "rdfs:comment",
        header: Some("Description"),
        required_header: true,
        shape: ValueShape::Scalar,
        default: DefaultValue::EmptyString,
        edge: None,
        node_field: true,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::RangeIncludes,
        document_key: "schema:rangeIncludes",
        header: Some("Valid Values"),
        required_header: true,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: Some(EdgeDirection::In),
        node_field: false,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::RequiresDependency,
        document_key: "sms:requiresDependency",
        header: Some("DependsOn"),
        required_header: true,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: Some(EdgeDirection::Out),
        node_field: false,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::RequiresComponent,
        document_key: "sms:requiresComponent",
        header: Some("DependsOn Component"),
        required_header: true,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: Some(EdgeDirection::Out),
        node_field: false,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::Required,
        document_key: "sms:required",
        header: Some("Required"),
        required_header: true,
        shape: ValueShape::Bool,
        default: DefaultValue::False,
        edge: None,
        node_field: true,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::SubClassOf,
        document_key: "rdfs:subClassOf",
        header: Some("Parent"),
        required_header: true,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: Some(EdgeDirection::Out),
        node_field: false,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::ValidationRules,
        document_key: "sms:validationRules",
        header: Some("Validation Rules"),
        required_header: true,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: None,
        node_field: true,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::DomainIncludes,
        document_key: "schema:domainIncludes",
        header: Some("Properties"),
        required_header: true,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: Some(EdgeDirection::Out),
        node_field: false,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::Source,
        document_key: "sms:source",
        header: Some("Source"),
        required_header: true,
        shape: ValueShape::Scalar,
        default: DefaultValue::None,
        edge: None,
        node_field: false,
        allowed_values: None,
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::ColumnType,
        document_key: "sms:columnType",
        header: Some("ColumnType"),
        required_header: false,
        shape: ValueShape::Scalar,
        default: DefaultValue::None,
        edge: None,
        node_field: false,
        allowed_values: Some(COLUMN_TYPES),
        synthetic: false,
    },
    RelationshipDescriptor {
        relation: Relation::ParentOf,
        document_key: "sms:parentOf",
        header: None,
        required_header: false,
        shape: ValueShape::List,
        default: DefaultValue::EmptyList,
        edge: Some(EdgeDirection::Out),
        node_field: false,
        allowed_values: None,
        synthetic: true,
    },
];

/// The relationship catalog. Pure lookup, no side effects; constructed once
/// and shared by parser, builder, explorer, and validator.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry;

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Descriptor for a known relationship.
    pub fn descriptor(&self, relation: Relation) -> &'static RelationshipDescriptor {
        DESCRIPTORS
            .iter()
            .find(|d| d.relation == relation)
            .expect("every Relation has a descriptor")
    }

    /// All descriptors, in catalog order.
    pub fn descriptors(&self) -> impl Iterator<Item = &'static RelationshipDescriptor> {
        DESCRIPTORS.iter()
    }

    /// Descriptors that parsers look for in input documents.
    pub fn parsed_descriptors(&self) -> impl Iterator<Item = &'static RelationshipDescriptor> {
        DESCRIPTORS.iter().filter(|d| !d.synthetic)
    }

    /// Resolve a relationship by its internal key.
    pub fn lookup(&self, key: &str) -> Result<Relation> {
        DESCRIPTORS
            .iter()
            .find(|d| d.relation.name() == key)
            .map(|d| d.relation)
            .ok_or_else(|| ModelError::UnknownRelationship(key.to_string()))
    }

    /// The relationship a tabular column header maps to, if any.
    pub fn relation_for_header(&self, header: &str) -> Option<Relation> {
        DESCRIPTORS
            .iter()
            .find(|d| d.header == Some(header))
            .map(|d| d.relation)
    }

    /// The relationship a linked-data document key maps to, if any.
    pub fn relation_for_document_key(&self, key: &str) -> Option<Relation> {
        DESCRIPTORS
            .iter()
            .filter(|d| !d.synthetic)
            .find(|d| d.document_key == key)
            .map(|d| d.relation)
    }

    /// Tabular headers that must be present for a document to be parseable.
    pub fn required_headers(&self) -> BTreeSet<&'static str> {
        DESCRIPTORS
            .iter()
            .filter(|d| d.required_header)
            .filter_map(|d| d.header)
            .collect()
    }

    /// Relationships that form graph edges, with their headers.
    pub fn edge_relationships(&self) -> Vec<(Relation, Option<&'static str>)> {
        DESCRIPTORS
            .iter()
            .filter(|d| d.edge.is_some())
            .map(|d| (d.relation, d.header))
            .collect()
    }

    /// Relationships stored as node attributes, with their headers.
    pub fn value_relationships(&self) -> Vec<(Relation, Option<&'static str>)> {
        DESCRIPTORS
            .iter()
            .filter(|d| d.edge.is_none())
            .map(|d| (d.relation, d.header))
            .collect()
    }
}
