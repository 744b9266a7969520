//! convoyd — the Convoy daemon.
//!
//! Wraps the placement, conciliation and statistics engines behind a
//! CLI, and runs them periodically against a fleet snapshot.
//!
//! # Usage
//!
//! ```text
//! convoyd place --config convoy.toml --snapshot fleet.json --load 15
//! convoyd conciliate --config convoy.toml --snapshot fleet.json --strategy senicide
//! convoyd stats 10 20 30
//! convoyd run --config convoy.toml --snapshot fleet.json --interval 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::watch;
use tracing::info;

use convoy_conciliation::{StopQueue, conciliate, detect_conflicts};
use convoy_core::{
    ConciliationStrategy, ConvoyConfig, DeploymentStrategy, NodeSelection, NodeTable,
};
use convoy_placement::select_node;

mod control_loop;
mod snapshot;

use control_loop::ControlLoop;
use snapshot::FleetSnapshot;

#[derive(Parser)]
#[command(
    name = "convoyd",
    about = "Convoy — process fleet placement and conciliation",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Choose the node that should host a process.
    Place {
        /// Fleet configuration (convoy.toml).
        #[arg(short, long, default_value = "convoy.toml")]
        config: PathBuf,
        /// Fleet snapshot (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Override the configured deployment strategy
        /// (config, less_loaded, most_loaded).
        #[arg(long)]
        strategy: Option<DeploymentStrategy>,
        /// Loading the process adds to its node, in percent.
        #[arg(short, long)]
        load: u32,
        /// Candidate nodes, comma separated, or `*` for every node.
        #[arg(short, long, default_value = "*")]
        nodes: NodeSelection,
    },
    /// Resolve processes running on more than one node.
    Conciliate {
        #[arg(short, long, default_value = "convoy.toml")]
        config: PathBuf,
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Override the configured conciliation strategy
        /// (senicide, infanticide, user, stop, restart).
        #[arg(long)]
        strategy: Option<ConciliationStrategy>,
    },
    /// Print mean, instant rate, trend and deviation of samples.
    Stats {
        #[arg(required = true, allow_negative_numbers = true)]
        samples: Vec<f64>,
    },
    /// Run the control loop until Ctrl-C.
    Run {
        #[arg(short, long, default_value = "convoy.toml")]
        config: PathBuf,
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Seconds between ticks.
        #[arg(short, long, default_value = "5")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,convoy=debug"))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Place {
            config,
            snapshot,
            strategy,
            load,
            nodes,
        } => place(&config, &snapshot, strategy, load, &nodes),
        Command::Conciliate {
            config,
            snapshot,
            strategy,
        } => conciliate_once(&config, &snapshot, strategy),
        Command::Stats { samples } => {
            let stats = convoy_stats::get_stats(&samples);
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Run {
            config,
            snapshot,
            interval,
        } => run(&config, snapshot, interval).await,
    }
}

fn load_fleet(
    config: &Path,
    snapshot: &Path,
) -> anyhow::Result<(ConvoyConfig, NodeTable, FleetSnapshot)> {
    let config = ConvoyConfig::from_file(config)?;
    let mut table = NodeTable::from_config(&config)?;
    let snapshot = FleetSnapshot::from_file(snapshot)?;
    snapshot.apply_to(&mut table)?;
    Ok((config, table, snapshot))
}

fn place(
    config: &Path,
    snapshot: &Path,
    strategy: Option<DeploymentStrategy>,
    load: u32,
    nodes: &NodeSelection,
) -> anyhow::Result<()> {
    let (config, table, _) = load_fleet(config, snapshot)?;
    let strategy = strategy.unwrap_or(config.deployment.strategy);

    match select_node(&table, strategy, nodes, load) {
        Some(node) => println!("{node}"),
        None => println!("none"),
    }
    Ok(())
}

fn conciliate_once(
    config: &Path,
    snapshot: &Path,
    strategy: Option<ConciliationStrategy>,
) -> anyhow::Result<()> {
    let (config, _, snapshot) = load_fleet(config, snapshot)?;
    let strategy = strategy.unwrap_or(config.conciliation.strategy);

    let mut queue = StopQueue::new();
    let mut conflicts = detect_conflicts(snapshot.instances());
    let report = conciliate(&mut queue, strategy, &mut conflicts);

    let output = json!({
        "report": report,
        "stops": queue.drain(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(config: &Path, snapshot: PathBuf, interval: u64) -> anyhow::Result<()> {
    let config = ConvoyConfig::from_file(config)?;
    info!(
        nodes = config.fleet.nodes.len(),
        deployment = %config.deployment.strategy,
        conciliation = %config.conciliation.strategy,
        "convoy daemon starting"
    );

    let mut control = ControlLoop::new(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        control
            .run(snapshot, Duration::from_secs(interval.max(1)), shutdown_rx)
            .await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    handle.await?;

    info!("convoy daemon stopped");
    Ok(())
}
