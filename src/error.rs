//! Error types for the model compiler

use thiserror::Error;

use crate::relations::Relation;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model compiler errors
///
/// Definition and lookup errors abort the current operation and propagate to
/// the caller. Structural findings (cycles, missing node fields, reserved
/// names) are never raised as errors; they are collected into
/// [`crate::graph::Diagnostics`] by `run_checks`.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model document is missing required headers: {missing:?}")]
    MissingHeaders { missing: Vec<String> },

    #[error(
        "model document uses deprecated header '{found}'; rename it to '{replacement}'"
    )]
    DeprecatedHeader { found: String, replacement: String },

    #[error("unknown relationship: {0}")]
    UnknownRelationship(String),

    #[error("unsupported column type '{value}' for attribute '{attribute}' (allowed: {allowed:?})")]
    UnsupportedColumnType {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("unknown model document format: {0}")]
    UnknownFormat(String),

    #[error("malformed model document: {0}")]
    MalformedDocument(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node '{node}' is missing attribute '{attribute}'")]
    MissingAttribute { node: String, attribute: String },

    #[error("'{0}' is not a valid component: it has no dependency attributes")]
    InvalidComponent(String),

    #[error("relationship '{0}' subgraph contains a cycle; topological ordering is undefined")]
    CyclicRelationshipSubgraph(Relation),

    #[error("ancestor resolution for '{node}' exceeded {limit} paths; the class hierarchy is too densely connected")]
    TooManyAncestorPaths { node: String, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
