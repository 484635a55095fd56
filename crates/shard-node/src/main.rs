// shard-node/src/main.rs
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use shard_core::SystemClock;
use shard_node::{Network, NodeId, SimConfig, Workload};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shard-sim")]
#[command(about = "Sharded Blockchain Simulator", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults are used when it does not exist)
    #[arg(short, long, global = true, default_value = "./shard-sim.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./shard-sim.toml")]
        output: String,
    },

    /// Start a network with the given shape and show it
    Start {
        /// Number of shards
        #[arg(short, long)]
        shards: Option<u64>,

        /// Nodes per shard
        #[arg(short, long)]
        nodes: Option<u64>,
    },

    /// Generate sample transactions for a node
    Generate {
        /// Node id
        #[arg(short, long)]
        node: NodeId,

        /// Number of transactions
        #[arg(long, default_value = "10")]
        count: usize,
    },

    /// Mine blocks on a node
    Mine {
        /// Node id
        #[arg(short, long)]
        node: NodeId,

        /// Number of blocks to mine
        #[arg(short, long, default_value = "1")]
        rounds: u64,

        /// Sample transactions to load before mining
        #[arg(short, long, default_value = "0")]
        transactions: usize,
    },

    /// Show network status
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load every node and mine all of them for several rounds
    Simulate {
        /// Mining rounds
        #[arg(short, long, default_value = "3")]
        rounds: u64,

        /// Sample transactions generated per node before each round
        #[arg(short, long, default_value = "20")]
        txs_per_node: usize,

        /// Print the final status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("shard_node={log_level},shard_core={log_level},shard_sim={log_level}").into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Start { shards, nodes } => {
            let mut config = load_config(&cli.config)?;
            if let Some(shards) = shards {
                config.network.shards = shards;
            }
            if let Some(nodes) = nodes {
                config.network.nodes_per_shard = nodes;
            }
            config.validate()?;
            let network = start_network(&config)?;
            println!("{}", network.info());
        }
        Commands::Generate { node, count } => {
            let config = load_config(&cli.config)?;
            generate_transactions(&config, node, count)?;
        }
        Commands::Mine { node, rounds, transactions } => {
            let config = load_config(&cli.config)?;
            mine_blocks(&config, node, rounds, transactions)?;
        }
        Commands::Status { json } => {
            let config = load_config(&cli.config)?;
            let network = start_network(&config)?;
            print_info(&network, json)?;
        }
        Commands::Simulate { rounds, txs_per_node, json } => {
            let config = load_config(&cli.config)?;
            simulate(&config, rounds, txs_per_node, json).await?;
        }
    }

    Ok(())
}

fn init_config(output: &str) -> anyhow::Result<()> {
    let config = SimConfig::default();
    config.to_file(output)?;
    tracing::info!("Default configuration written to {}", output);
    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<SimConfig> {
    if Path::new(path).exists() {
        tracing::info!("Loading configuration from {}", path);
        SimConfig::from_file(path)
    } else {
        tracing::debug!("No configuration at {}, using defaults", path);
        Ok(SimConfig::default())
    }
}

fn start_network(config: &SimConfig) -> anyhow::Result<Network> {
    tracing::info!(
        "Starting network with {} shards and {} nodes per shard",
        config.network.shards,
        config.network.nodes_per_shard
    );
    Ok(Network::bootstrap(&config.network, config.chain, Arc::new(SystemClock))?)
}

fn make_rng(config: &SimConfig) -> StdRng {
    match config.workload.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn workload(config: &SimConfig, network: &Network) -> Workload {
    Workload::new(network.shard_count(), config.workload.cross_shard_ratio)
}

fn generate_transactions(config: &SimConfig, node_id: NodeId, count: usize) -> anyhow::Result<()> {
    let network = start_network(config)?;
    let node = network.node(node_id)?;
    let mut rng = make_rng(config);

    tracing::info!("Generating {} transactions for node {}", count, node_id);
    let workload = workload(config, &network);
    let transactions = node.generate_sample_transactions(&workload, &mut rng, count)?;

    for (i, tx) in transactions.iter().take(5).enumerate() {
        println!(
            "Transaction {}: {} -> {}, Amount: {}, Shard: {} -> {}, Hash: {}",
            i,
            tx.sender(),
            tx.recipient(),
            tx.amount(),
            tx.from_shard(),
            tx.to_shard(),
            tx.hash().short()
        );
    }

    node.add_transactions(transactions);
    println!("{}", node.report_status());
    Ok(())
}

fn mine_blocks(
    config: &SimConfig,
    node_id: NodeId,
    rounds: u64,
    preload: usize,
) -> anyhow::Result<()> {
    let mut network = start_network(config)?;
    let workload = workload(config, &network);
    let mut rng = make_rng(config);

    let node = network.node_mut(node_id)?;
    if preload > 0 {
        let transactions = node.generate_sample_transactions(&workload, &mut rng, preload)?;
        node.add_transactions(transactions);
    }

    for _ in 0..rounds {
        match node.mine() {
            Some(block) => println!(
                "Block #{} mined with {} transactions ({})",
                block.number(),
                block.body().len(),
                block.hash()
            ),
            None => println!("Node {} failed to mine a block", node_id),
        }
    }

    println!("{}", node.report_status());
    Ok(())
}

async fn simulate(
    config: &SimConfig,
    rounds: u64,
    txs_per_node: usize,
    json: bool,
) -> anyhow::Result<()> {
    let mut network = start_network(config)?;
    let workload = workload(config, &network);
    let mut rng = make_rng(config);

    for round in 1..=rounds {
        for node in network.nodes() {
            let transactions =
                node.generate_sample_transactions(&workload, &mut rng, txs_per_node)?;
            node.add_transactions(transactions);
        }

        // nodes share nothing, so each one mines on its own blocking task
        let mut tasks = JoinSet::new();
        for mut node in network.take_nodes() {
            tasks.spawn_blocking(move || {
                let mined = node.mine().is_some();
                (node, mined)
            });
        }

        let mut mined = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let (node, ok) = joined?;
            mined += usize::from(ok);
            network.add_node(node)?;
        }
        tracing::info!("Round {}: {}/{} nodes mined a block", round, mined, network.len());
    }

    print_info(&network, json)
}

fn print_info(network: &Network, json: bool) -> anyhow::Result<()> {
    let info = network.info();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{info}");
    }
    Ok(())
}
