//! JSON Schema synthesis
//!
//! Compiles the dependency neighborhood of a component node into a JSON
//! Schema (draft-07) document with `properties`, `required`, and `allOf`
//! conditional blocks expressing "if attribute X takes enum value V then
//! attribute Y becomes required".
//!
//! The traversal is a worklist fixed point, not a one-pass recursion: a
//! node's conditional requirement is only resolvable after the dependency
//! that introduces the condition has itself been processed. Nodes that
//! cannot be classified yet are popped without being marked processed; they
//! are re-enqueued when the node that triggers them expands its
//! dependencies, and the iteration converges once the worklist drains.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::error::{ModelError, Result};
use crate::graph::{ColumnType, ModelGraph};
use crate::relations::Relation;

/// Validation-rule token marking an attribute as list-valued in manifests.
const LIST_RULE: &str = "list";

/// How an attribute enters the schema; decides the constraint shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emission {
    /// Unconditionally required
    Required,
    /// Required only when a trigger value is chosen
    Conditional,
    /// Present but optional; enums tolerate the blank token
    Optional,
}

/// Compile the JSON validation schema for one component.
///
/// `root` is the component's node label; `schema_name` only feeds the output
/// document's `$id` and `title`. A node with no dependency attributes is not
/// a legal manifest root and fails with [`ModelError::InvalidComponent`].
pub fn get_json_validation_schema(
    graph: &ModelGraph,
    root: &str,
    schema_name: &str,
    config: &SynthesisConfig,
) -> Result<Value> {
    graph.node_or_err(root)?;

    let root_dependencies =
        graph.adjacent_nodes_schema_ordered(root, Relation::RequiresDependency)?;
    if root_dependencies.is_empty() {
        return Err(ModelError::InvalidComponent(root.to_string()));
    }

    let mut properties: Map<String, Value> = Map::new();
    let mut required: Vec<String> = Vec::new();
    let mut all_of: Vec<Value> = Vec::new();

    let root_dependency_set: HashSet<&String> = root_dependencies.iter().collect();
    let mut worklist: VecDeque<String> = root_dependencies.iter().cloned().collect();
    // Nodes whose constraint has been emitted; deferred nodes stay out so a
    // later visit can still classify them.
    let mut processed: HashSet<String> = HashSet::new();
    // Nodes whose adjacents have been recorded and enqueued once.
    let mut expanded: HashSet<String> = HashSet::new();
    // dependent display name -> display names of the nodes that require it
    let mut reverse_dependencies: HashMap<String, Vec<String>> = HashMap::new();
    // enum value display name -> display names of attributes it is a valid
    // value of
    let mut range_domain_map: HashMap<String, Vec<String>> = HashMap::new();

    while let Some(label) = worklist.pop_front() {
        if processed.contains(&label) {
            continue;
        }
        let node = graph.node_or_err(&label)?;
        let display_name = node.display_name.clone();

        let range_labels = graph.adjacent_nodes_schema_ordered(&label, Relation::RangeIncludes)?;
        let range_names = graph.display_names_of(&range_labels)?;
        let dependency_labels =
            graph.adjacent_nodes_schema_ordered(&label, Relation::RequiresDependency)?;
        let dependency_names = graph.display_names_of(&dependency_labels)?;

        let is_list = graph
            .node_validation_rules(&label)?
            .iter()
            .any(|rule| rule.split_whitespace().next() == Some(LIST_RULE));
        let is_required = graph.node_is_required(&label)?;

        if expanded.insert(label.clone()) {
            for dependency in &dependency_names {
                let triggers = reverse_dependencies.entry(dependency.clone()).or_default();
                if !triggers.contains(&display_name) {
                    triggers.push(display_name.clone());
                }
            }
            for value in &range_names {
                let domains = range_domain_map.entry(value.clone()).or_default();
                if !domains.contains(&display_name) {
                    domains.push(display_name.clone());
                }
            }
            worklist.extend(range_labels.iter().cloned());
            worklist.extend(dependency_labels.iter().cloned());
        }

        if let Some(triggers) = reverse_dependencies.get(&display_name) {
            // Conditionally required: the property itself is emitted without
            // a `required` entry, and one allOf block is emitted per
            // (watched attribute, triggering value) pair.
            let constraint = property_constraint(
                &range_names,
                is_list,
                node.column_type,
                Emission::Conditional,
                config,
            );
            properties.insert(display_name.clone(), constraint.clone());
            for trigger_value in triggers {
                let Some(domains) = range_domain_map.get(trigger_value) else {
                    continue;
                };
                for watched in domains {
                    all_of.push(json!({
                        "if": {
                            "properties": { watched.as_str(): { "enum": [trigger_value] } }
                        },
                        "then": {
                            "properties": { display_name.as_str(): constraint.clone() },
                            "required": [display_name.as_str()]
                        }
                    }));
                }
            }
        } else if is_required {
            properties.insert(
                display_name.clone(),
                property_constraint(
                    &range_names,
                    is_list,
                    node.column_type,
                    Emission::Required,
                    config,
                ),
            );
            required.push(display_name.clone());
        } else if root_dependency_set.contains(&label) {
            properties.insert(
                display_name.clone(),
                property_constraint(
                    &range_names,
                    is_list,
                    node.column_type,
                    Emission::Optional,
                    config,
                ),
            );
        } else {
            // Not classifiable yet: leave unprocessed so a later trigger can
            // bring it back through the worklist.
            continue;
        }

        processed.insert(label);
    }

    debug!(
        component = root,
        properties = properties.len(),
        conditionals = all_of.len(),
        "synthesized validation schema"
    );

    let mut schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": format!(
            "{}/{}.schema.json",
            config.schema_id_base.trim_end_matches('/'),
            schema_name
        ),
        "title": schema_name,
        "type": "object",
        "properties": Value::Object(properties),
        "required": required,
    });
    // Some consumers reject an empty allOf, so the key is omitted entirely
    // when no conditionals were produced.
    if !all_of.is_empty() {
        schema["allOf"] = Value::Array(all_of);
    }
    Ok(schema)
}

/// The constraint object for one attribute.
fn property_constraint(
    range: &[String],
    is_list: bool,
    column_type: Option<ColumnType>,
    emission: Emission,
    config: &SynthesisConfig,
) -> Value {
    if !range.is_empty() {
        if is_list {
            let mut constraint = json!({
                "type": "array",
                "items": { "enum": range }
            });
            if config.bound_arrays {
                constraint["maxItems"] = json!(range.len());
            }
            return constraint;
        }
        let mut values = range.to_vec();
        if emission == Emission::Optional {
            // Blank-tolerant: optional enum columns may be left empty
            values.push(String::new());
        }
        return json!({ "enum": values });
    }

    if is_list {
        return match column_type {
            Some(ct) => json!({ "type": "array", "items": { "type": ct.json_type() } }),
            None => json!({ "type": "array" }),
        };
    }

    if let Some(ct) = column_type {
        return json!({ "type": ct.json_type() });
    }

    match emission {
        // Free-typed but must not be blank
        Emission::Required | Emission::Conditional => json!({
            "not": { "type": "null" },
            "minLength": 1
        }),
        Emission::Optional => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use crate::parser::tabular;
    use crate::relations::RelationshipRegistry;

    const HEADER: &str = "Attribute,Description,Valid Values,DependsOn,Required,Parent,Properties,DependsOn Component,Source,Validation Rules,ColumnType";

    fn build(rows: &str) -> ModelGraph {
        let registry = RelationshipRegistry::new();
        let attributes =
            tabular::parse_reader(format!("{}\n{}", HEADER, rows).as_bytes(), &registry).unwrap();
        ModelGraph::build(&attributes, &registry).unwrap()
    }

    fn patient_graph() -> ModelGraph {
        build(concat!(
            "Patient,,,\"Diagnosis, Sex, Year of Birth\",,,,,,,\n",
            "Sex,,\"Female, Male, Other\",,TRUE,,,,,,\n",
            "Year of Birth,,,,FALSE,,,,,,integer\n",
            "Diagnosis,,\"Healthy, Cancer\",,TRUE,,,,,,\n",
            "Cancer,,,\"Cancer Type, Family History\",,,,,,,\n",
            "Cancer Type,,\"Breast, Colorectal, Lung\",,,,,,,,\n",
            "Family History,,\"Breast, Colorectal, Lung\",,,,,,,\"list strict\",",
        ))
    }

    #[test]
    fn test_invalid_root_rejected() {
        let graph = build("Patient,,,Diagnosis,,,,,,,\nDiagnosis,,,,,,,,,,");
        let err = get_json_validation_schema(
            &graph,
            "Diagnosis",
            "Diagnosis_validation",
            &SynthesisConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidComponent(_)));
    }

    #[test]
    fn test_unknown_root_rejected() {
        let graph = build("Patient,,,Diagnosis,,,,,,,\nDiagnosis,,,,,,,,,,");
        assert!(matches!(
            get_json_validation_schema(&graph, "Nope", "x", &SynthesisConfig::default()),
            Err(ModelError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_conditional_dependencies() {
        let graph = patient_graph();
        let schema = get_json_validation_schema(
            &graph,
            "Patient",
            "Patient_validation",
            &SynthesisConfig::default(),
        )
        .unwrap();

        // Diagnosis is a required enum
        let diagnosis_enum: Vec<&str> = schema["properties"]["Diagnosis"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(diagnosis_enum, vec!["Healthy", "Cancer"]);
        assert!(schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "Diagnosis"));

        // Choosing Cancer makes Cancer Type and Family History required
        let all_of = schema["allOf"].as_array().unwrap();
        let mut conditional_targets = Vec::new();
        for block in all_of {
            assert_eq!(
                block["if"]["properties"]["Diagnosis"]["enum"],
                json!(["Cancer"])
            );
            for target in block["then"]["required"].as_array().unwrap() {
                conditional_targets.push(target.as_str().unwrap().to_string());
            }
        }
        assert!(conditional_targets.contains(&"Cancer Type".to_string()));
        assert!(conditional_targets.contains(&"Family History".to_string()));

        // Conditional attributes are present but not top-level required
        assert!(schema["properties"].get("Cancer Type").is_some());
        assert!(!schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "Cancer Type"));
    }

    #[test]
    fn test_list_rule_emits_bounded_array() {
        let graph = patient_graph();
        let schema = get_json_validation_schema(
            &graph,
            "Patient",
            "Patient_validation",
            &SynthesisConfig::default(),
        )
        .unwrap();

        let family_history = &schema["properties"]["Family History"];
        assert_eq!(family_history["type"], "array");
        assert_eq!(family_history["items"]["enum"].as_array().unwrap().len(), 3);
        assert_eq!(family_history["maxItems"], json!(3));
    }

    #[test]
    fn test_unbounded_arrays_config() {
        let graph = patient_graph();
        let config = SynthesisConfig {
            bound_arrays: false,
            ..SynthesisConfig::default()
        };
        let schema =
            get_json_validation_schema(&graph, "Patient", "Patient_validation", &config).unwrap();
        assert!(schema["properties"]["Family History"].get("maxItems").is_none());
    }

    #[test]
    fn test_optional_enum_is_blank_tolerant() {
        let graph = build(concat!(
            "Patient,,,\"Sex, Diagnosis\",,,,,,,\n",
            "Sex,,\"Female, Male\",,FALSE,,,,,,\n",
            "Diagnosis,,,,TRUE,,,,,,",
        ));
        let schema = get_json_validation_schema(
            &graph,
            "Patient",
            "Patient_validation",
            &SynthesisConfig::default(),
        )
        .unwrap();
        let sex_enum = schema["properties"]["Sex"]["enum"].as_array().unwrap();
        assert!(sex_enum.contains(&json!("")));
        assert!(!schema["required"].as_array().unwrap().iter().any(|v| v == "Sex"));
    }

    #[test]
    fn test_empty_all_of_omitted() {
        let graph = build(concat!(
            "Patient,,,Sex,,,,,,,\n",
            "Sex,,\"Female, Male\",,TRUE,,,,,,",
        ));
        let schema = get_json_validation_schema(
            &graph,
            "Patient",
            "Patient_validation",
            &SynthesisConfig::default(),
        )
        .unwrap();
        assert!(schema.get("allOf").is_none());
    }

    #[test]
    fn test_column_type_drives_type() {
        let graph = patient_graph();
        let schema = get_json_validation_schema(
            &graph,
            "Patient",
            "Patient_validation",
            &SynthesisConfig::default(),
        )
        .unwrap();
        assert_eq!(schema["properties"]["Year of Birth"]["type"], "integer");
    }
}
