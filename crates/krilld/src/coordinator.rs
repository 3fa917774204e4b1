//! The coordinator role: ring + replication engine + client-facing ports.
//!
//! The coordinator is stateless. It holds the placement ring (built once
//! from the configured node list), delegates every Put/Get to the
//! replication engine, and exposes two surfaces: an RPC port speaking the
//! same wire protocol as the storage nodes, and the HTTP gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use krill_engine::ReplicationEngine;
use krill_net::{NodeClient, NodeRequest, NodeResponse, TcpNodeClient, read_frame, write_frame};
use krill_ring::Ring;
use krill_types::{NodeAddr, ReplicationMode};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::gateway::Gateway;

/// `krilld coordinator` entrypoint.
pub async fn run(config: CliConfig) -> Result<()> {
    let nodes: Vec<NodeAddr> = config
        .coordinator
        .nodes
        .iter()
        .map(|n| NodeAddr::from(n.as_str()))
        .collect();
    anyhow::ensure!(
        !nodes.is_empty(),
        "coordinator needs at least one storage node (--node or [coordinator] nodes)"
    );

    let mode: ReplicationMode = config
        .coordinator
        .mode
        .parse()
        .context("invalid replication mode")?;

    let ring = Ring::build(&nodes, config.coordinator.ring_replicas);
    let client: Arc<dyn NodeClient> = Arc::new(TcpNodeClient::with_call_timeout(
        Duration::from_millis(config.coordinator.call_timeout_ms),
    ));
    let engine = Arc::new(ReplicationEngine::new(ring, mode, client.clone()));

    info!(
        %mode,
        nodes = nodes.len(),
        rf = engine.replication_factor(),
        ring_replicas = config.coordinator.ring_replicas,
        "coordinator configured"
    );

    // RPC port speaking the node wire protocol.
    let rpc_listener = TcpListener::bind(&config.coordinator.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.coordinator.listen_addr))?;
    info!(addr = %config.coordinator.listen_addr, "rpc listening");
    {
        let engine = engine.clone();
        tokio::spawn(serve_rpc(rpc_listener, engine));
    }

    // HTTP gateway for browsers and the dashboard.
    let gateway = Gateway::new(engine, client, nodes);
    gateway
        .serve_with_shutdown(&config.coordinator.http_addr, crate::shutdown_signal())
        .await
        .context("gateway failed")?;

    info!("coordinator shutdown complete");
    Ok(())
}

/// Accept loop for the RPC port.
pub(crate) async fn serve_rpc(listener: TcpListener, engine: Arc<ReplicationEngine>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let engine = engine.clone();
                tokio::spawn(async move {
                    debug!(%peer, "client connected");
                    handle_conn(stream, engine).await;
                });
            }
            Err(e) => warn!(%e, "accept failed"),
        }
    }
}

/// Serve requests on one client connection until it closes.
async fn handle_conn(mut stream: TcpStream, engine: Arc<ReplicationEngine>) {
    loop {
        let request: NodeRequest = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(_) => break,
        };
        let response = dispatch(&engine, request).await;
        if write_frame(&mut stream, &response).await.is_err() {
            break;
        }
    }
}

/// Map one client request onto the engine.
///
/// Any `forward_to` a client attaches is ignored — chain suffixes are
/// engine business, built per replica set.
async fn dispatch(engine: &ReplicationEngine, request: NodeRequest) -> NodeResponse {
    match request {
        NodeRequest::Put { key, value, .. } => match engine.put(&key, &value).await {
            Ok(()) => NodeResponse::PutOk,
            Err(e) => NodeResponse::Error {
                message: e.to_string(),
            },
        },
        NodeRequest::Get { key } => match engine.get(&key).await {
            Ok(reply) => NodeResponse::Value {
                value: reply.value,
                found: reply.found,
            },
            Err(e) => NodeResponse::Error {
                message: e.to_string(),
            },
        },
        NodeRequest::Stats => NodeResponse::Error {
            message: "stats is served by storage nodes, not the coordinator".to_string(),
        },
    }
}
