//! Model Compiler CLI
//!
//! Compiles a model document into a graph snapshot, runs the structural
//! checks, and synthesizes per-component JSON validation schemas.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use curator_schemas::{
    get_json_validation_schema, parse_model, run_checks, ModelConfig, ModelGraph,
    RelationshipRegistry,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "model-compiler")]
#[command(about = "Compile metadata models into graphs and JSON Schemas")]
struct Cli {
    /// Path to a config file (curator.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model document and write the graph snapshot
    Compile {
        /// Model document (.csv or .jsonld)
        model: PathBuf,
        /// Output file (JSON snapshot); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run structural checks over a model
    Check {
        /// Model document (.csv or .jsonld)
        model: PathBuf,
        /// Write a JSON report of the findings
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Synthesize the JSON validation schema for a component
    Schema {
        /// Model document (.csv or .jsonld)
        model: PathBuf,
        /// Component node label (or display name)
        component: String,
        /// Schema name for the output document's title and $id
        #[arg(short, long)]
        name: Option<String>,
        /// Output file; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ModelConfig::load_from(cli.config.as_deref())?;
    let registry = RelationshipRegistry::new();

    match cli.command {
        Commands::Compile { model, output } => {
            let attributes = parse_model(&model, &registry)?;
            let graph = ModelGraph::build(&attributes, &registry)?;

            println!(
                "✅ Compiled {} attributes into {} nodes, {} edges (hash {})",
                attributes.len(),
                graph.node_count(),
                graph.edge_count(),
                &graph.content_hash[..12]
            );

            let snapshot = serde_json::to_string_pretty(&graph.snapshot())?;
            if let Some(path) = output {
                std::fs::write(&path, &snapshot)?;
                println!("✅ Snapshot written to {:?}", path);
            } else {
                println!("{}", snapshot);
            }
            Ok(())
        }

        Commands::Check { model, report } => {
            let attributes = parse_model(&model, &registry)?;
            let graph = ModelGraph::build(&attributes, &registry)?;
            let diagnostics = run_checks(&graph, &config.checks);

            if let Some(path) = report {
                let report_json = serde_json::json!({
                    "generated_at": chrono::Utc::now().to_rfc3339(),
                    "model_hash": graph.content_hash,
                    "errors": diagnostics.error_count(),
                    "warnings": diagnostics.warning_count(),
                    "findings": diagnostics.all(),
                });
                std::fs::write(&path, serde_json::to_string_pretty(&report_json)?)?;
                println!("✅ Report written to {:?}", path);
            }

            if diagnostics.is_empty() {
                println!("✅ Model is structurally valid ({} nodes)", graph.node_count());
                return Ok(());
            }

            print!("{}", diagnostics.format_all());
            if diagnostics.has_errors() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Schema { model, component, name, output } => {
            let attributes = parse_model(&model, &registry)?;
            let graph = ModelGraph::build(&attributes, &registry)?;

            let diagnostics = run_checks(&graph, &config.checks);
            if diagnostics.has_errors() {
                // No best-effort schemas from a structurally broken graph
                print!("{}", diagnostics.format_all());
                eprintln!("❌ Refusing to synthesize from a graph with structural errors");
                std::process::exit(1);
            }

            let root = if graph.contains(&component) {
                component.clone()
            } else {
                graph.node_label_from_display_name(&component)?
            };
            let schema_name = name.unwrap_or_else(|| format!("{}_validation", root));
            let schema =
                get_json_validation_schema(&graph, &root, &schema_name, &config.synthesis)?;

            let schema_json = serde_json::to_string_pretty(&schema)?;

            if let Some(path) = output {
                std::fs::write(&path, &schema_json)?;
                println!("✅ Schema written to {:?}", path);
            } else {
                println!("{}", schema_json);
            }
            Ok(())
        }
    }
}
