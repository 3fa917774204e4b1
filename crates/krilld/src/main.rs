//! `krilld` — the Krill daemon.
//!
//! One binary, three roles:
//!
//! ```text
//! krilld node --listen-addr 127.0.0.1:7401 --max-keys 1000
//! krilld node --listen-addr 127.0.0.1:7402
//! krilld coordinator --mode quorum --node 127.0.0.1:7401 --node 127.0.0.1:7402
//! krilld demo --coordinator-addr 127.0.0.1:7400
//! ```
//!
//! Storage nodes hold data in memory behind the wire protocol. The
//! coordinator builds the placement ring from the configured node list and
//! routes every client Put/Get through the replication engine, exposing an
//! RPC port and an HTTP gateway. The demo seeds a running coordinator with
//! sample traffic and reads it back.

mod config;
mod coordinator;
mod gateway;
mod node;
mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use krill_net::{NodeClient, TcpNodeClient};
use krill_types::NodeAddr;
use tracing::info;

use config::CliConfig;

#[derive(Parser)]
#[command(
    name = "krilld",
    version,
    about = "Krill sharded key-value store daemon"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the coordinator.
    Coordinator {
        /// Replication mode: sync, async, chain, or quorum.
        #[arg(short, long)]
        mode: Option<String>,

        /// RPC listen address.
        #[arg(short, long)]
        listen_addr: Option<String>,

        /// HTTP gateway listen address.
        #[arg(long)]
        http_addr: Option<String>,

        /// Storage node address. Can be specified multiple times.
        #[arg(short, long)]
        node: Vec<String>,
    },

    /// Start a storage node.
    Node {
        /// RPC listen address.
        #[arg(short, long)]
        listen_addr: Option<String>,

        /// Maximum number of keys held (0 = unlimited).
        #[arg(long)]
        max_keys: Option<usize>,

        /// Advisory request-rate ceiling reported in stats (0 = unlimited).
        #[arg(long)]
        max_load: Option<u64>,
    },

    /// Seed a running coordinator with sample traffic and read it back.
    Demo {
        /// Coordinator RPC address.
        #[arg(short = 'a', long, default_value = "127.0.0.1:7400")]
        coordinator_addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;
    telemetry::init(&config.log.level);

    match cli.command {
        Commands::Coordinator {
            mode,
            listen_addr,
            http_addr,
            node,
        } => {
            // CLI flags override config file values.
            if let Some(mode) = mode {
                config.coordinator.mode = mode;
            }
            if let Some(addr) = listen_addr {
                config.coordinator.listen_addr = addr;
            }
            if let Some(addr) = http_addr {
                config.coordinator.http_addr = addr;
            }
            if !node.is_empty() {
                config.coordinator.nodes = node;
            }
            coordinator::run(config).await
        }

        Commands::Node {
            listen_addr,
            max_keys,
            max_load,
        } => {
            if let Some(addr) = listen_addr {
                config.node.listen_addr = addr;
            }
            if let Some(n) = max_keys {
                config.node.max_keys = n;
            }
            if let Some(n) = max_load {
                config.node.max_load = n;
            }
            node::run(config).await
        }

        Commands::Demo { coordinator_addr } => cmd_demo(coordinator_addr).await,
    }
}

/// Wait for a SIGTERM or SIGINT (Ctrl-C) signal.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, initiating shutdown"),
        () = terminate => info!("received SIGTERM, initiating shutdown"),
    }
}

// -----------------------------------------------------------------------
// krilld demo
// -----------------------------------------------------------------------

/// Write a handful of users through the coordinator, then read them back
/// (plus one key that should be missing).
async fn cmd_demo(addr: String) -> Result<()> {
    let coordinator = NodeAddr::from(addr);
    let client = TcpNodeClient::new();

    let seed = [
        ("user:1", "Alice"),
        ("user:2", "Bob"),
        ("user:3", "Charlie"),
        ("user:4", "Dave"),
        ("user:5", "Eve"),
    ];
    for (key, value) in seed {
        client
            .put(&coordinator, key, value, "")
            .await
            .with_context(|| format!("put {key}"))?;
        println!("Put({key}, {value})");
    }

    println!("---");

    for key in ["user:1", "user:2", "user:3", "user:4", "user:5", "user:99"] {
        let reply = client
            .get(&coordinator, key)
            .await
            .with_context(|| format!("get {key}"))?;
        println!("Get({key}) -> {} (found: {})", reply.value, reply.found);
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
