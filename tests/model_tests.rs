//! End-to-end tests over the example model fixtures
//!
//! Exercises the full pipeline: document parsing (both variants), graph
//! construction, explorer queries, structural checks, and JSON Schema
//! synthesis, including validating manifest records against the emitted
//! schema.

use std::io::Write;
use std::path::PathBuf;

use serde_json::json;

use curator_schemas::{
    get_json_validation_schema, parse_model, run_checks, ChecksConfig, ModelError, ModelGraph,
    Relation, RelationshipRegistry, SynthesisConfig,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn example_graph() -> ModelGraph {
    let registry = RelationshipRegistry::new();
    let attributes = parse_model(&fixture("example_model.csv"), &registry).unwrap();
    ModelGraph::build(&attributes, &registry).unwrap()
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_tabular_and_linked_data_agree() {
    let registry = RelationshipRegistry::new();
    let from_csv = parse_model(&fixture("example_model.csv"), &registry).unwrap();
    let from_jsonld = parse_model(&fixture("example_model.jsonld"), &registry).unwrap();

    assert_eq!(from_csv, from_jsonld);

    let csv_graph = ModelGraph::build(&from_csv, &registry).unwrap();
    let jsonld_graph = ModelGraph::build(&from_jsonld, &registry).unwrap();
    assert_eq!(csv_graph.content_hash, jsonld_graph.content_hash);
    assert_eq!(csv_graph.node_count(), jsonld_graph.node_count());
    assert_eq!(csv_graph.edge_count(), jsonld_graph.edge_count());
}

#[test]
fn test_parse_model_dispatches_on_extension() {
    let registry = RelationshipRegistry::new();

    let mut csv_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(
        csv_file,
        "Attribute,Description,Valid Values,DependsOn,Required,Parent,Properties,DependsOn Component,Source,Validation Rules\nSex,,\"Female, Male\",,TRUE,,,,,"
    )
    .unwrap();
    let attributes = parse_model(csv_file.path(), &registry).unwrap();
    assert!(attributes.contains("Sex"));

    let err = parse_model(&fixture("example_model.txt"), &registry).unwrap_err();
    assert!(matches!(err, ModelError::UnknownFormat(_)));
}

// =============================================================================
// Graph structure
// =============================================================================

#[test]
fn test_structural_checks_pass_on_example_model() {
    let graph = example_graph();
    let diagnostics = run_checks(&graph, &ChecksConfig::default());
    assert!(!diagnostics.has_errors(), "{}", diagnostics.format_all());
}

#[test]
fn test_range_weights_preserve_author_order() {
    let graph = example_graph();
    let values = graph
        .adjacent_nodes_schema_ordered("FamilyHistory", Relation::RangeIncludes)
        .unwrap();
    assert_eq!(
        values,
        vec!["Breast".to_string(), "Colorectal".to_string(), "Lung".to_string()]
    );
}

#[test]
fn test_component_requirement_closure() {
    let graph = example_graph();
    let requirements = graph.component_requirements("Biospecimen").unwrap();
    assert_eq!(requirements, vec!["Patient".to_string()]);
    assert!(graph.component_requirements("Patient").unwrap().is_empty());
}

#[test]
fn test_ancestor_chains() {
    let graph = example_graph();
    let chains = graph.find_parent_classes("Cancer", 100).unwrap();
    assert_eq!(chains, vec![vec!["Diagnosis".to_string()]]);

    let chains = graph.find_parent_classes("Patient", 100).unwrap();
    assert_eq!(chains, vec![vec!["DataType".to_string()]]);
}

#[test]
fn test_property_nodes_use_property_casing() {
    let graph = example_graph();
    assert!(graph.contains("patientID"));
    assert_eq!(graph.display_name_of("patientID").unwrap(), "Patient ID");
    assert_eq!(
        graph.node_label_from_display_name("Patient ID").unwrap(),
        "patientID"
    );
}

#[test]
fn test_snapshot_round_trip() {
    let registry = RelationshipRegistry::new();
    let graph = example_graph();

    let serialized = serde_json::to_string(&graph.snapshot()).unwrap();
    let snapshot = serde_json::from_str(&serialized).unwrap();
    let restored = ModelGraph::from_snapshot(snapshot, registry).unwrap();

    assert_eq!(restored.node_count(), graph.node_count());
    assert_eq!(restored.edge_count(), graph.edge_count());
    assert_eq!(restored.content_hash, graph.content_hash);
    assert_eq!(
        restored
            .adjacent_nodes_schema_ordered("Diagnosis", Relation::RangeIncludes)
            .unwrap(),
        graph
            .adjacent_nodes_schema_ordered("Diagnosis", Relation::RangeIncludes)
            .unwrap()
    );
    assert_eq!(
        restored.node_dependencies("Patient", true, true).unwrap(),
        graph.node_dependencies("Patient", true, true).unwrap()
    );
}

#[test]
fn test_cycle_is_reported_not_thrown() {
    let registry = RelationshipRegistry::new();
    let header = "Attribute,Description,Valid Values,DependsOn,Required,Parent,Properties,DependsOn Component,Source,Validation Rules";
    let body = "A,,,B,,,,,,\nB,,,A,,,,,,";
    let attributes = curator_schemas::parser::tabular::parse_reader(
        format!("{}\n{}", header, body).as_bytes(),
        &registry,
    )
    .unwrap();
    let graph = ModelGraph::build(&attributes, &registry).unwrap();

    let diagnostics = run_checks(&graph, &ChecksConfig::default());
    assert!(diagnostics.has_errors());
}

// =============================================================================
// Schema synthesis
// =============================================================================

#[test]
fn test_patient_schema_shape() {
    let graph = example_graph();
    let schema = get_json_validation_schema(
        &graph,
        "Patient",
        "Patient_validation",
        &SynthesisConfig::default(),
    )
    .unwrap();

    assert_eq!(schema["title"], "Patient_validation");
    assert_eq!(
        schema["$id"],
        "http://example.com/Patient_validation.schema.json"
    );

    let required = schema["required"].as_array().unwrap();
    for name in ["Diagnosis", "Sex", "Patient ID"] {
        assert!(required.iter().any(|v| v == name), "missing required {}", name);
    }
    assert!(!required.iter().any(|v| v == "Year of Birth"));

    let diagnosis_enum = schema["properties"]["Diagnosis"]["enum"].as_array().unwrap();
    assert!(diagnosis_enum.contains(&json!("Healthy")));
    assert!(diagnosis_enum.contains(&json!("Cancer")));

    let conditional_targets: Vec<String> = schema["allOf"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|block| {
            assert_eq!(
                block["if"]["properties"]["Diagnosis"]["enum"],
                json!(["Cancer"])
            );
            block["then"]["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(conditional_targets.contains(&"Cancer Type".to_string()));
    assert!(conditional_targets.contains(&"Family History".to_string()));
}

#[test]
fn test_biospecimen_schema_has_no_all_of() {
    let graph = example_graph();
    let schema = get_json_validation_schema(
        &graph,
        "Biospecimen",
        "Biospecimen_validation",
        &SynthesisConfig::default(),
    )
    .unwrap();
    assert!(schema.get("allOf").is_none());
    assert!(schema["properties"].get("Sample ID").is_some());
}

#[test]
fn test_synthesis_rejects_non_component_root() {
    let graph = example_graph();
    let err = get_json_validation_schema(&graph, "Sex", "Sex_validation", &SynthesisConfig::default())
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidComponent(_)));
}

#[test]
fn test_manifest_records_validate_against_schema() {
    let graph = example_graph();
    let schema = get_json_validation_schema(
        &graph,
        "Patient",
        "Patient_validation",
        &SynthesisConfig::default(),
    )
    .unwrap();
    let compiled = jsonschema::JSONSchema::compile(&schema).expect("emitted schema is valid draft-07");

    let healthy = json!({
        "Patient ID": "P-001",
        "Sex": "Female",
        "Year of Birth": 1982,
        "Diagnosis": "Healthy"
    });
    assert!(compiled.is_valid(&healthy));

    // Choosing Cancer without the conditionally required attributes fails
    let missing_conditionals = json!({
        "Patient ID": "P-002",
        "Sex": "Male",
        "Diagnosis": "Cancer"
    });
    assert!(!compiled.is_valid(&missing_conditionals));

    let complete_cancer = json!({
        "Patient ID": "P-003",
        "Sex": "Other",
        "Diagnosis": "Cancer",
        "Cancer Type": "Breast",
        "Family History": ["Colorectal", "Lung"]
    });
    assert!(compiled.is_valid(&complete_cancer));

    // Enum violations fail
    let bad_enum = json!({
        "Patient ID": "P-004",
        "Sex": "Unknown",
        "Diagnosis": "Healthy"
    });
    assert!(!compiled.is_valid(&bad_enum));
}
