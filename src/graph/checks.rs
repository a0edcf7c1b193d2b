//! Structural validation
//!
//! Checks over a finished graph. Findings are collected into
//! [`Diagnostics`]; the graph is returned to the caller either way so
//! tooling can display every problem from a single compile. Callers are
//! expected to refuse schema synthesis on a graph carrying errors.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, kosaraju_scc};
use regex::Regex;

use super::diagnostics::{CheckCode, CheckItem, Diagnostics};
use super::ModelGraph;
use crate::config::ChecksConfig;
use crate::labels::blacklisted_characters_in;
use crate::relations::Relation;

/// Run every structural check over a compiled graph.
pub fn run_checks(graph: &ModelGraph, config: &ChecksConfig) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    check_acyclic(graph, &mut diagnostics);
    check_node_fields(graph, &mut diagnostics);
    check_labels(graph, &mut diagnostics);
    check_reserved_names(graph, config, &mut diagnostics);
    check_display_names(graph, config, &mut diagnostics);
    diagnostics
}

/// Every relationship subgraph must be a DAG. Cycle members are reported via
/// SCC enumeration when possible; if the subgraph is cyclic but every SCC is
/// trivial, a generic finding is reported instead of crashing.
fn check_acyclic(graph: &ModelGraph, diagnostics: &mut Diagnostics) {
    for (relation, _) in graph.registry().edge_relationships() {
        let sub = graph.digraph_by_edge_type(relation);
        if !is_cyclic_directed(&sub) {
            continue;
        }

        let cycles: Vec<Vec<String>> = kosaraju_scc(&sub)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|idx| sub[idx].clone()).collect())
            .collect();

        if cycles.is_empty() {
            diagnostics.push(CheckItem::new(
                relation.name(),
                CheckCode::GraphNotAcyclic,
                format!(
                    "the '{}' subgraph is not a directed acyclic graph and no cycle could be isolated",
                    relation
                ),
            ));
            continue;
        }

        for members in cycles {
            diagnostics.push(
                CheckItem::new(
                    relation.name(),
                    CheckCode::RelationshipCycle,
                    format!("the '{}' subgraph contains a cycle", relation),
                )
                .with_context(format!("members: {}", members.join(" -> "))),
            );
        }
    }
}

/// Every node must carry the attributes the registry marks mandatory. One
/// finding per (node, missing field) pair.
fn check_node_fields(graph: &ModelGraph, diagnostics: &mut Diagnostics) {
    let mandatory: Vec<Relation> = graph
        .registry()
        .descriptors()
        .filter(|d| d.node_field)
        .map(|d| d.relation)
        .collect();

    for node in graph.all_nodes() {
        for relation in &mandatory {
            let missing = match relation {
                Relation::DisplayName => node.display_name.is_empty(),
                Relation::Comment => node.comment.is_none(),
                Relation::Required => node.required.is_none(),
                Relation::ValidationRules => node.validation_rules.is_none(),
                _ => false,
            };
            if missing {
                let message = crate::error::ModelError::MissingAttribute {
                    node: node.label.clone(),
                    attribute: relation.name().to_string(),
                }
                .to_string();
                diagnostics.push(CheckItem::new(
                    node.label.clone(),
                    CheckCode::MissingNodeField,
                    message,
                ));
            }
        }
    }
}

/// Labels must be code-safe identifiers, unique across the graph.
fn check_labels(graph: &ModelGraph, diagnostics: &mut Diagnostics) {
    let ident = Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("static pattern");
    for node in graph.all_nodes() {
        if !ident.is_match(&node.label) {
            diagnostics.push(CheckItem::new(
                node.label.clone(),
                CheckCode::MalformedLabel,
                format!(
                    "label '{}' (from display name '{}') is not a valid identifier",
                    node.label, node.display_name
                ),
            ));
        }
    }

    // Label collisions leave orphaned graph nodes behind: the indexes keep
    // only the last writer, so they must be surfaced rather than queried
    // around.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in graph.labels() {
        *counts.entry(label).or_insert(0) += 1;
    }
    for (label, count) in counts {
        if count > 1 {
            diagnostics.push(CheckItem::new(
                label,
                CheckCode::DuplicateLabel,
                format!(
                    "{} display names normalize to the label '{}'",
                    count, label
                ),
            ));
        }
    }
}

/// Node labels may not collide with reserved identifiers. Matching is
/// case-insensitive; collisions are reported, never silently renamed.
fn check_reserved_names(
    graph: &ModelGraph,
    config: &ChecksConfig,
    diagnostics: &mut Diagnostics,
) {
    let reserved: HashSet<String> = config
        .reserved_names
        .iter()
        .map(|name| name.to_lowercase())
        .collect();

    for node in graph.all_nodes() {
        if reserved.contains(&node.label.to_lowercase()) {
            diagnostics.push(CheckItem::new(
                node.label.clone(),
                CheckCode::ReservedNameCollision,
                format!("label '{}' collides with a reserved identifier", node.label),
            ));
        }
    }
}

/// Display names containing characters a downstream annotation store strips
/// are flagged as warnings, since silent stripping there can collide names
/// invisibly.
fn check_display_names(
    graph: &ModelGraph,
    config: &ChecksConfig,
    diagnostics: &mut Diagnostics,
) {
    for node in graph.all_nodes() {
        let found: Vec<char> = blacklisted_characters_in(&node.display_name)
            .into_iter()
            .filter(|c| config.blacklisted_characters.contains(*c))
            .collect();
        if !found.is_empty() {
            diagnostics.push(
                CheckItem::new(
                    node.label.clone(),
                    CheckCode::BlacklistedCharacters,
                    format!(
                        "display name '{}' contains characters stripped by downstream stores",
                        node.display_name
                    ),
                )
                .with_context(format!("characters: {:?}", found)),
            );
        }
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
    fn test_clean_graph_passes() {
        let graph = build("Patient,,,Diagnosis,,,,,,,\nDiagnosis,,Healthy,,TRUE,,,,,,");
        let diagnostics = run_checks(&graph, &ChecksConfig::default());
        assert!(!diagnostics.has_errors(), "{}", diagnostics);
    }

    #[test]
    fn test_dependency_cycle_reported_not_raised() {
        let graph = build("A,,,B,,,,,,,\nB,,,A,,,,,,,");
        let diagnostics = run_checks(&graph, &ChecksConfig::default());
        assert!(diagnostics.has_errors());
        assert!(diagnostics
            .errors()
            .any(|item| item.code == CheckCode::RelationshipCycle));
        let cycle = diagnostics
            .errors()
            .find(|item| item.code == CheckCode::RelationshipCycle)
            .unwrap();
        assert!(cycle.context.iter().any(|c| c.contains('A') && c.contains('B')));
    }

    #[test]
    fn test_reserved_name_collision_case_insensitive() {
        let graph = build("entity id,,,,,,,,,,");
        let diagnostics = run_checks(&graph, &ChecksConfig::default());
        assert!(diagnostics
            .errors()
            .any(|item| item.code == CheckCode::ReservedNameCollision));
    }

    #[test]
    fn test_duplicate_labels_reported() {
        // Both display names normalize to the class label "DataType"
        let graph = build("Data Type,,,,,,,,,,\nDataType,,,,,,,,,,");
        let diagnostics = run_checks(&graph, &ChecksConfig::default());
        assert!(diagnostics
            .errors()
            .any(|item| item.code == CheckCode::DuplicateLabel));
    }

    #[test]
    fn test_blacklisted_characters_warn_only() {
        let graph = build("Patient (Deceased),,,,,,,,,,");
        let diagnostics = run_checks(&graph, &ChecksConfig::default());
        assert!(!diagnostics.has_errors());
        assert!(diagnostics
            .warnings()
            .any(|item| item.code == CheckCode::BlacklistedCharacters));
    }
}
