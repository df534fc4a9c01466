use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use serde::Serialize;
use tokio::runtime::Builder;
use uuid::Uuid;

use ospf_ripple::analysis::{build_matrix_with, score_all_pairs};
use ospf_ripple::network::NodeIndex;
use ospf_ripple::{
    analyze_impact_with, AnalysisError, DirectedGraph, Distance, EngineConfig, Grouping,
    OverrideSet, PairSelection, PathCache, PathSet, Snapshot, TopologyDocument,
};

#[derive(Parser)]
#[command(name = "ospf-ripple", about = "Routing and what-if impact analysis over link-state topologies")]
struct Cli {
    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of alternate paths returned.
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Override the path exploration budget.
    #[arg(long, global = true)]
    budget: Option<usize>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shortest cost and ranked alternates between two nodes
    Path {
        #[arg(long)]
        topology: PathBuf,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Aggregated cost matrix
    Matrix {
        #[arg(long)]
        topology: PathBuf,
        #[arg(long, value_enum, default_value_t = MatrixBy::Group)]
        by: MatrixBy,
    },
    /// Before/after impact of a set of link edits
    Impact {
        #[arg(long)]
        topology: PathBuf,
        #[arg(long)]
        overrides: PathBuf,
        #[arg(long, value_enum, default_value_t = Scope::Groups)]
        scope: Scope,
    },
    /// Transit criticality over every node pair
    Transit {
        #[arg(long)]
        topology: PathBuf,
    },
    /// Re-run the impact analysis whenever the input files change
    Watch {
        #[arg(long)]
        topology: PathBuf,
        #[arg(long)]
        overrides: PathBuf,
        #[arg(long, value_enum, default_value_t = Scope::Groups)]
        scope: Scope,
        /// Polling interval in seconds
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MatrixBy {
    Node,
    Group,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scope {
    Nodes,
    Groups,
    Both,
}

impl Scope {
    fn selection(self) -> PairSelection {
        match self {
            Scope::Nodes => PairSelection::AllNodes,
            Scope::Groups => PairSelection::AllGroups,
            Scope::Both => PairSelection::All,
        }
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    command: &'static str,
    result: T,
}

#[derive(Serialize)]
struct PathReport {
    source: String,
    target: String,
    shortest: Distance,
    alternates: PathSet,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(limit) = cli.limit {
        config.search.limit = limit;
    }
    if let Some(budget) = cli.budget {
        config.search.exploration_budget = budget;
    }
    config.validate()?;

    let rt = Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(cli.command, config))
}

async fn run(command: Command, config: EngineConfig) -> Result<()> {
    match command {
        Command::Path { topology, from, to } => {
            let snapshot = load_snapshot(&topology).await?;
            let report = tokio::task::spawn_blocking(move || -> Result<PathReport> {
                let graph = DirectedGraph::from_snapshot(&snapshot);
                let source = node_index(&graph, &from)?;
                let target = node_index(&graph, &to)?;
                let mut cache = PathCache::with_options(&graph, config.search);
                let shortest = cache.distance(source, target);
                let alternates = cache.alternates(source, target).clone();
                Ok(PathReport {
                    source: from,
                    target: to,
                    shortest,
                    alternates,
                })
            })
            .await??;
            emit("path", report)
        }
        Command::Matrix { topology, by } => {
            let snapshot = load_snapshot(&topology).await?;
            let grouping = match by {
                MatrixBy::Node => Grouping::Node,
                MatrixBy::Group => Grouping::Group,
            };
            let matrix = tokio::task::spawn_blocking(move || {
                let graph = DirectedGraph::from_snapshot(&snapshot);
                let mut cache = PathCache::new(&graph);
                build_matrix_with(&mut cache, grouping, &config.matrix)
            })
            .await?;
            emit("matrix", matrix)
        }
        Command::Impact {
            topology,
            overrides,
            scope,
        } => {
            let before = load_snapshot(&topology).await?;
            let edits = load_overrides(&overrides).await?;
            let report = tokio::task::spawn_blocking(move || -> Result<_> {
                let after = before.apply_edits(&edits.edits)?;
                Ok(analyze_impact_with(&before, &after, &scope.selection(), &config.criticality)?)
            })
            .await??;
            emit("impact", report)
        }
        Command::Transit { topology } => {
            let snapshot = load_snapshot(&topology).await?;
            let scores = tokio::task::spawn_blocking(move || {
                let graph = DirectedGraph::from_snapshot(&snapshot);
                let mut cache = PathCache::new(&graph);
                score_all_pairs(&mut cache, &config.criticality)
            })
            .await?;
            emit("transit", scores)
        }
        Command::Watch {
            topology,
            overrides,
            scope,
            interval,
        } => watch(topology, overrides, scope, Duration::from_secs(interval.max(1)), config).await,
    }
}

async fn watch(
    topology: PathBuf,
    overrides: PathBuf,
    scope: Scope,
    interval: Duration,
    config: EngineConfig,
) -> Result<()> {
    info!(
        "Watching {} and {} every {}s",
        topology.display(),
        overrides.display(),
        interval.as_secs()
    );

    let mut last_seen: Option<(SystemTime, SystemTime)> = None;

    loop {
        match (modified(&topology).await, modified(&overrides).await) {
            (Ok(topo_stamp), Ok(edit_stamp)) => {
                let stamp = (topo_stamp, edit_stamp);
                if last_seen != Some(stamp) {
                    last_seen = Some(stamp);
                    info!("Input changed, recomputing impact");
                    if let Err(e) = impact_once(&topology, &overrides, scope, &config).await {
                        error!("Impact run failed: {:#}", e);
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => error!("Cannot stat inputs: {:#}", e),
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn impact_once(topology: &Path, overrides: &Path, scope: Scope, config: &EngineConfig) -> Result<()> {
    let before = load_snapshot(topology).await?;
    let edits = load_overrides(overrides).await?;
    let config = config.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let after = before.apply_edits(&edits.edits)?;
        Ok(analyze_impact_with(&before, &after, &scope.selection(), &config.criticality)?)
    })
    .await??;
    emit("impact", report)
}

fn node_index(graph: &DirectedGraph, id: &str) -> Result<NodeIndex> {
    graph
        .index_of(id)
        .ok_or_else(|| AnalysisError::UnknownNode(id.to_string()).into())
}

async fn modified(path: &Path) -> Result<SystemTime> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("reading metadata of {}", path.display()))?;
    Ok(metadata.modified()?)
}

async fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading topology {}", path.display()))?;
    let document = TopologyDocument::from_json(&content)
        .with_context(|| format!("parsing topology {}", path.display()))?;
    let snapshot = document
        .into_snapshot()
        .with_context(|| format!("validating topology {}", path.display()))?;
    info!(
        "Loaded topology {}: {} nodes, {} links",
        path.display(),
        snapshot.nodes().len(),
        snapshot.links().len()
    );
    Ok(snapshot)
}

async fn load_overrides(path: &Path) -> Result<OverrideSet> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading overrides {}", path.display()))?;
    let set = OverrideSet::from_json(&content)
        .with_context(|| format!("parsing overrides {}", path.display()))?;
    info!("Loaded {} link edits from {}", set.edits.len(), path.display());
    Ok(set)
}

fn emit<T: Serialize>(command: &'static str, result: T) -> Result<()> {
    let envelope = Envelope {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        command,
        result,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
