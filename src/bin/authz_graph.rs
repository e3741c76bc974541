//! CLI for laying out and sharing authorization schemas
//!
//! Usage:
//!   authz-graph graph model.yaml                      # Stabilize and print positions (JSON)
//!   authz-graph graph model.yaml --mode hierarchical  # Layered layout
//!   authz-graph share model.yaml --dir ./store        # Snapshot into a local directory
//!   authz-graph share model.yaml --url https://bucket # PUT to an object store
//!   authz-graph fetch <id> --dir ./store              # Print a shared snapshot
//!   authz-graph config                                # Print the default config

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use authz_graph::share::{HttpStore, LocalDirStore};
use authz_graph::{
    build, load_shared, LayoutEngine, LayoutMode, LayoutStatus, NodeKind, Schema, ShareService,
    SnapshotSource, Uploader, VisualizerConfig,
};

#[derive(Parser)]
#[command(name = "authz-graph")]
#[command(about = "Lay out and share authorization model graphs")]
struct Cli {
    /// Visualizer config (YAML); defaults apply when omitted
    #[arg(short, long, global = true, env = "AUTHZ_GRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the graph, run the layout to completion and print node positions
    Graph {
        schema: PathBuf,

        /// Override the configured layout mode
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Upload a snapshot of the schema and print its id and link
    Share {
        schema: PathBuf,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Download a shared snapshot and print it as YAML
    Fetch {
        id: String,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Print the effective config as YAML
    Config,
}

#[derive(Args)]
struct StoreArgs {
    /// Local directory store
    #[arg(long, conflicts_with = "url")]
    dir: Option<PathBuf>,

    /// HTTP object store base URL
    #[arg(long)]
    url: Option<String>,

    /// Bearer token for the HTTP store
    #[arg(long, env = "AUTHZ_GRAPH_TOKEN", requires = "url")]
    token: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Physics,
    Hierarchical,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Serialize)]
struct PlacedNode<'a> {
    id: &'a str,
    kind: NodeKind,
    label: &'a str,
    x: f32,
    y: f32,
}

#[derive(Serialize)]
struct LayoutReport<'a> {
    status: &'static str,
    iterations: u32,
    nodes: Vec<PlacedNode<'a>>,
    edges: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VisualizerConfig::default(),
    };

    match cli.command {
        Command::Graph {
            schema,
            mode,
            format,
        } => graph(&config, &schema, mode, format),
        Command::Share { schema, store } => share(&config, &schema, &store).await,
        Command::Fetch { id, store } => fetch(&config, &id, &store).await,
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

fn read_schema(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    Schema::from_yaml_str(&text).with_context(|| format!("parsing schema {}", path.display()))
}

fn graph(config: &VisualizerConfig, path: &Path, mode: Option<Mode>, format: Format) -> Result<()> {
    let schema = read_schema(path)?;
    let graph = build(&schema)?;

    let mut config = config.clone();
    if let Some(mode) = mode {
        config.layout.mode = match mode {
            Mode::Physics => LayoutMode::Physics,
            Mode::Hierarchical => LayoutMode::Hierarchical,
        };
    }

    let mut engine = LayoutEngine::new(&config)?;
    engine.set_graph(&graph);
    let status = engine.run_to_completion();
    for event in engine.drain_events() {
        tracing::debug!(?event, "layout event");
    }
    if status == LayoutStatus::TimedOut {
        tracing::warn!(
            iterations = engine.state().iterations(),
            "layout did not settle, printing best-effort positions"
        );
    }

    let nodes: Vec<PlacedNode> = graph
        .nodes()
        .iter()
        .filter_map(|node| {
            let pos = engine.position(&node.id)?;
            Some(PlacedNode {
                id: &node.id,
                kind: node.kind,
                label: &node.label,
                x: pos.x,
                y: pos.y,
            })
        })
        .collect();

    let report = LayoutReport {
        status: match status {
            LayoutStatus::Idle => "idle",
            LayoutStatus::Running => "running",
            LayoutStatus::Stable => "stable",
            LayoutStatus::TimedOut => "timed_out",
        },
        iterations: engine.state().iterations(),
        nodes,
        edges: graph.edge_count(),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            println!(
                "{} nodes, {} edges, {} after {} iterations",
                report.nodes.len(),
                report.edges,
                report.status,
                report.iterations
            );
            for node in &report.nodes {
                println!("  {:<40} {:<10} ({:>8.1}, {:>8.1})", node.id, node.kind.as_str(), node.x, node.y);
            }
        }
    }
    Ok(())
}

/// Store selected on the command line, usable for both directions.
trait Store: Uploader + SnapshotSource {}
impl<T: Uploader + SnapshotSource> Store for T {}

fn open_store(args: &StoreArgs) -> Result<Arc<dyn Store>> {
    match (&args.dir, &args.url) {
        (Some(dir), None) => Ok(Arc::new(LocalDirStore::new(dir))),
        (None, Some(url)) => {
            let mut store = HttpStore::new(url);
            if let Some(token) = &args.token {
                store = store.with_bearer_token(token);
            }
            Ok(Arc::new(store))
        }
        _ => bail!("pass exactly one of --dir or --url"),
    }
}

async fn share(config: &VisualizerConfig, path: &Path, args: &StoreArgs) -> Result<()> {
    let schema = read_schema(path)?;
    // Surface schema errors before anything is uploaded
    build(&schema)?;

    let service = ShareService::new(open_store(args)?, &config.share);
    let handle = service.share(&schema).await?;
    println!("id:   {}", handle.id);
    println!("path: {}", handle.path);
    println!("link: {}", handle.link);
    Ok(())
}

async fn fetch(config: &VisualizerConfig, id: &str, args: &StoreArgs) -> Result<()> {
    let store = open_store(args)?;
    let schema = load_shared(store.as_ref(), &config.share, id).await?;
    print!("{}", schema.to_yaml_string()?);
    Ok(())
}
