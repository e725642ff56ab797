//! NodeScape command-line runner.
//!
//! Provides the `nodescape` binary with subcommands for working with graph
//! documents: `run` evaluates a document for a number of passes and prints
//! each pass report as JSON; `inspect` prints the metadata of every node.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use nodescape_core::NodeId;
use nodescape_engine::{GraphDocument, NodeScape, NodeScapeConfig, StandaloneHost};

/// Node graph evaluation tools.
#[derive(Parser)]
#[command(name = "nodescape", about = "Node graph evaluation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate a graph document.
    Run {
        /// Path to the graph document (JSON).
        #[arg(short, long)]
        graph: PathBuf,

        /// Number of evaluation passes.
        #[arg(short, long, default_value_t = 1)]
        passes: usize,

        /// Evaluator configuration file (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Record and print a trace of every node evaluation.
        #[arg(long)]
        trace: bool,

        /// Module to treat as running. Repeatable; without any, every
        /// module counts as running.
        #[arg(short, long = "module")]
        modules: Vec<String>,
    },

    /// Print the metadata of every node in a graph document.
    Inspect {
        /// Path to the graph document (JSON).
        #[arg(short, long)]
        graph: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { trace: true, .. });
    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let exit_code = match cli.command {
        Commands::Run {
            graph,
            passes,
            config,
            trace,
            modules,
        } => run_graph(&graph, passes, config.as_deref(), trace, modules),
        Commands::Inspect { graph } => inspect_graph(&graph),
    };
    process::exit(exit_code);
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = clean, 1 = at least one pass recorded faults,
/// 3 = I/O or document error.
fn run_graph(
    graph_path: &Path,
    passes: usize,
    config_path: Option<&Path>,
    trace: bool,
    modules: Vec<String>,
) -> i32 {
    let mut config = match config_path.map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };
    config.trace_enabled |= trace;

    let host = if modules.is_empty() {
        StandaloneHost::new()
    } else {
        StandaloneHost::with_running_modules(modules)
    };
    let mut scape = NodeScape::new(Box::new(host), config);

    if let Err(msg) = load_into(graph_path, &mut scape) {
        eprintln!("Error: {}", msg);
        return 3;
    }

    let mut faulted = false;
    for pass in 0..passes {
        let report = scape.update();
        faulted |= !report.is_clean();
        let line = serde_json::json!({ "pass": pass, "report": report });
        println!("{}", line);
    }

    if faulted {
        1
    } else {
        0
    }
}

/// Execute the inspect subcommand.
fn inspect_graph(graph_path: &Path) -> i32 {
    let mut scape = NodeScape::with_defaults();
    let ids = match load_into(graph_path, &mut scape) {
        Ok(ids) => ids,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };

    let nodes: Vec<serde_json::Value> = ids
        .iter()
        .filter_map(|(key, id)| {
            let metadata = scape.metadata(*id)?;
            Some(serde_json::json!({ "key": key, "id": id, "metadata": metadata }))
        })
        .collect();
    let json = serde_json::to_string_pretty(&nodes)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize metadata: {}\"}}", e));
    println!("{}", json);
    0
}

fn load_config(path: &Path) -> Result<NodeScapeConfig, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read config '{}': {}", path.display(), e))?;
    serde_json::from_str(&json).map_err(|e| format!("invalid config '{}': {}", path.display(), e))
}

/// Loads a graph document into `scape`. Returns node keys with their ids,
/// in document order.
fn load_into(
    graph_path: &Path,
    scape: &mut NodeScape,
) -> Result<Vec<(String, NodeId)>, String> {
    let document = GraphDocument::from_path(graph_path)
        .map_err(|e| format!("failed to load graph '{}': {}", graph_path.display(), e))?;
    document
        .instantiate(scape)
        .map(|ids| ids.into_iter().collect())
        .map_err(|e| format!("failed to build graph '{}': {}", graph_path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "nodescape", "run", "--graph", "g.json", "--passes", "3", "--trace", "-m", "chatbox", "-m", "osc",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                graph,
                passes,
                config,
                trace,
                modules,
            } => {
                assert_eq!(graph, PathBuf::from("g.json"));
                assert_eq!(passes, 3);
                assert!(config.is_none());
                assert!(trace);
                assert_eq!(modules, vec!["chatbox", "osc"]);
            }
            Commands::Inspect { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn passes_default_to_one() {
        let cli = Cli::try_parse_from(["nodescape", "run", "-g", "g.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { passes: 1, .. }));
    }

    #[test]
    fn missing_graph_is_an_io_error() {
        assert_eq!(inspect_graph(Path::new("/nonexistent/graph.json")), 3);
    }
}
