//! Model Explorer CLI
//!
//! Structural queries over a compiled model graph: dependencies, valid
//! values, ancestor chains, component requirement closures, and fuzzy
//! attribute search.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use curator_schemas::{parse_model, ModelConfig, ModelGraph, Relation, RelationshipRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "model-explorer")]
#[command(about = "Query the structure of a compiled metadata model")]
struct Cli {
    /// Model document (.csv or .jsonld)
    #[arg(short, long)]
    model: PathBuf,

    /// Path to a config file (curator.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Direct dependency attributes of a node
    Dependencies {
        /// Node label or display name
        node: String,
        /// Preserve the order written in the source schema
        #[arg(long)]
        ordered: bool,
        /// Resolve labels to display names
        #[arg(long)]
        display_names: bool,
    },

    /// Valid values of an attribute
    Range {
        /// Node label or display name
        node: String,
    },

    /// Ancestor chains of a node in the class hierarchy
    Ancestors {
        /// Node label or display name
        node: String,
    },

    /// The closure of components a component transitively requires
    Components {
        /// Component label or display name
        component: String,
    },

    /// Fuzzy search over attribute names
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Adjacent nodes by an arbitrary relationship key
    Adjacent {
        /// Node label or display name
        node: String,
        /// Relationship key (e.g. requiresDependency, rangeIncludes)
        relation: String,
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
    let attributes = parse_model(&cli.model, &registry)?;
    let graph = ModelGraph::build(&attributes, &registry)?;

    match cli.command {
        Commands::Dependencies { node, ordered, display_names } => {
            let label = resolve(&graph, &node)?;
            let dependencies = graph.node_dependencies(&label, display_names, ordered)?;
            if dependencies.is_empty() {
                println!("{} has no dependency attributes", label);
            }
            for dependency in dependencies {
                println!("{}", dependency);
            }
            Ok(())
        }

        Commands::Range { node } => {
            let label = resolve(&graph, &node)?;
            let values = graph.adjacent_nodes_schema_ordered(&label, Relation::RangeIncludes)?;
            if values.is_empty() {
                println!("{} has no declared valid values", label);
            }
            for value in values {
                println!("{}", graph.display_name_of(&value)?);
            }
            Ok(())
        }

        Commands::Ancestors { node } => {
            let label = resolve(&graph, &node)?;
            let chains =
                graph.find_parent_classes(&label, config.explorer.max_ancestor_paths)?;
            if chains.is_empty() {
                println!("{} has no ancestors", label);
            }
            for chain in chains {
                println!("{}", chain.join(" -> "));
            }
            Ok(())
        }

        Commands::Components { component } => {
            let label = resolve(&graph, &component)?;
            let requirements = graph.component_requirements(&label)?;
            if requirements.is_empty() {
                println!("{} requires no other components", label);
            }
            for requirement in requirements {
                println!("{}", requirement);
            }
            Ok(())
        }

        Commands::Search { query, limit } => {
            for hit in graph.search(&query, limit) {
                println!("{:<30} {} (score {})", hit.label, hit.display_name, hit.score);
            }
            Ok(())
        }

        Commands::Adjacent { node, relation } => {
            let label = resolve(&graph, &node)?;
            let relation = registry.lookup(&relation)?;
            for adjacent in graph.adjacent_nodes_by_relationship(&label, relation)? {
                println!("{}", adjacent);
            }
            Ok(())
        }
    }
}

/// Accept either a label or a human-entered display name.
fn resolve(graph: &ModelGraph, node: &str) -> curator_schemas::Result<String> {
    if graph.contains(node) {
        return Ok(node.to_string());
    }
    graph.node_label_from_display_name(node)
}
