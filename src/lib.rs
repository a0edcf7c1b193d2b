//! Curator Metadata Model Compiler
//!
//! Compiles a declarative metadata model (CSV or JSON-LD) describing entity
//! types, their properties, valid values, and inter-attribute dependencies
//! into a directed multi-relationship graph and into JSON Schema documents
//! that validate metadata manifests against the model.
//!
//! ## Features
//!
//! - **Relationship Registry**: one catalog of relationship semantics shared
//!   by every component
//! - **Two Parser Variants**: tabular (CSV) and linked-data (JSON-LD)
//!   documents normalize to the same attribute map
//! - **Typed Multigraph**: petgraph-backed, with relationship-typed edges
//!   carrying source-order weights
//! - **Structural Checks**: DAG enforcement, field completeness, reserved
//!   names, and blacklisted characters, collected rather than raised
//! - **Conditional Schema Synthesis**: worklist traversal emitting
//!   `if`/`then` blocks for value-triggered requirements
//!
//! ## Architecture
//!
//! ```text
//! model document (.csv / .jsonld)
//!         │  parser
//!         ▼
//! AttributeMap (display name -> relationships)
//!         │  builder
//!         ▼
//! ModelGraph ──► explorer queries
//!         │  ├──► run_checks -> Diagnostics
//!         ▼
//! get_json_validation_schema -> JSON Schema (draft-07)
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod labels;
pub mod parser;
pub mod relations;
pub mod synthesis;

pub use config::{ChecksConfig, ExplorerConfig, ModelConfig, SynthesisConfig};
pub use error::{ModelError, Result};
pub use graph::{
    run_checks, CheckCode, CheckItem, ColumnType, Diagnostics, EntryKind, GraphSnapshot,
    ModelGraph, NodeData, SearchHit, Severity,
};
pub use parser::{parse_model, AttributeMap, ParsedValue};
pub use relations::{Relation, RelationshipRegistry};
pub use synthesis::get_json_validation_schema;
