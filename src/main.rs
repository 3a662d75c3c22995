use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder;

use dvsim::config::SimulationConfig;
use dvsim::INFINITY;
use dvsim::network::{matches_reference, ActorNetwork, Simulator};
use dvsim::protocol::{AgentSnapshot, DistanceVector, LoopPolicy};

#[derive(Parser)]
#[command(name = "dvsim", about = "Distance-vector routing simulator")]
struct Cli {
    /// Scenario file (JSON). Runs the built-in three-node demo when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run every node as its own tokio task instead of the deterministic simulator.
    #[arg(long)]
    actors: bool,

    /// Print each node's full distance table at the end.
    #[arg(long)]
    tables: bool,

    #[arg(long, value_enum)]
    policy: Option<LoopPolicy>,

    /// Seconds to wait for the actor network to go quiet after each event.
    #[arg(long, default_value_t = 30)]
    settle_timeout: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load_from_file(path)?,
        None => SimulationConfig::demo(),
    };
    if let Some(policy) = cli.policy {
        config.policy = policy;
        // the cutoff check depends on the policy
        config.validate()?;
    }

    info!(
        "Simulating {} nodes with {:?}, {} scripted link changes",
        config.size(),
        config.policy,
        config.link_changes.len()
    );

    let (snapshots, converged) = if cli.actors {
        let rt = Builder::new_multi_thread().enable_all().build()?;
        rt.block_on(run_actors(&config, Duration::from_secs(cli.settle_timeout)))?
    } else {
        run_simulator(&config)?
    };

    for snapshot in &snapshots {
        if cli.tables {
            print!("{}", snapshot.table);
            println!();
        }
        println!("node {}: {}  next hops {}", snapshot.id, snapshot.vector, next_hops(snapshot));
    }
    println!(
        "{}",
        if converged {
            "converged to the shortest-path costs"
        } else {
            "NOT converged to the shortest-path costs"
        }
    );

    Ok(())
}

fn run_simulator(config: &SimulationConfig) -> Result<(Vec<AgentSnapshot>, bool)> {
    let mut sim = Simulator::new(config.topology()?, config.agent_config())?
        .with_max_events(config.max_events);
    let report = sim.run_script(&config.link_changes)?;
    info!(
        "Simulator quiet after {} deliveries and {} link changes",
        report.delivered, report.link_changes
    );
    Ok((sim.snapshots(), sim.matches_reference()))
}

async fn run_actors(config: &SimulationConfig, limit: Duration) -> Result<(Vec<AgentSnapshot>, bool)> {
    let network = ActorNetwork::start(config.topology()?, config.agent_config())?;
    network.settle_within(limit).await?;

    // actors have no global delivery count, so changes apply in order once quiet
    let mut changes = config.link_changes.clone();
    changes.sort_by_key(|change| change.after);
    for change in &changes {
        network.change_link(change.a, change.b, change.cost())?;
        network.settle_within(limit).await?;
    }

    let snapshots = network.snapshots().await?;
    let vectors: Vec<DistanceVector> = snapshots.iter().map(|s| s.vector.clone()).collect();
    let converged = matches_reference(&network.topology().matrix(), &vectors);
    network.shutdown().await;
    Ok((snapshots, converged))
}

fn next_hops(snapshot: &AgentSnapshot) -> String {
    let hops: Vec<String> = snapshot
        .predecessors
        .iter()
        .map(|hop| hop.map(|h| h.to_string()).unwrap_or_else(|| "-".to_string()))
        .collect();
    let reachable = snapshot.vector.iter().filter(|&cost| cost != INFINITY).count();
    format!("[{}]  ({} reachable)", hops.join(", "), reachable)
}
