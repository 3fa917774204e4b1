//! The storage node role: the in-memory map behind the wire protocol.
//!
//! A node applies writes locally first and, when a chain suffix is
//! attached, forwards the write synchronously to the next hop before
//! replying — the reply that travels back up the chain therefore covers
//! every node behind it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use krill_net::{
    NodeClient, NodeRequest, NodeResponse, NodeStats, TcpNodeClient, read_frame, split_chain,
    write_frame,
};
use krill_store::{KvStore, LoadMeter};
use krill_types::NodeAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::CliConfig;

/// A storage node: its map, its load meter, and the client it forwards
/// chain writes through.
pub struct NodeService {
    store: KvStore,
    meter: LoadMeter,
    forwarder: TcpNodeClient,
    max_load: u64,
}

impl NodeService {
    /// Create a node service. `max_keys = 0` and `max_load = 0` disable
    /// the respective limits.
    pub fn new(max_keys: usize, max_load: u64, forward_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            store: KvStore::new(max_keys),
            meter: LoadMeter::new(),
            forwarder: TcpNodeClient::with_call_timeout(forward_timeout),
            max_load,
        })
    }

    /// Handle one request.
    pub async fn handle(&self, request: NodeRequest) -> NodeResponse {
        match request {
            NodeRequest::Put {
                key,
                value,
                forward_to,
            } => {
                self.meter.record();

                // Local write first; a full node refuses before the chain
                // behind it is touched.
                if let Err(e) = self.store.put(&key, &value) {
                    return NodeResponse::Error {
                        message: e.to_string(),
                    };
                }
                if forward_to.is_empty() {
                    return NodeResponse::PutOk;
                }

                let (next, rest) = split_chain(&forward_to);
                let next = NodeAddr::from(next);
                match self.forwarder.put(&next, &key, &value, rest).await {
                    Ok(()) => NodeResponse::PutOk,
                    Err(source) => {
                        warn!(%next, %source, "chain forwarding failed");
                        NodeResponse::Error {
                            message: format!("chain forwarding to {next} failed: {source}"),
                        }
                    }
                }
            }

            NodeRequest::Get { key } => {
                self.meter.record();
                match self.store.get(&key) {
                    Some(value) => NodeResponse::Value { value, found: true },
                    None => NodeResponse::Value {
                        value: String::new(),
                        found: false,
                    },
                }
            }

            // Stats reads don't count toward the request rate.
            NodeRequest::Stats => NodeResponse::Stats(NodeStats {
                key_count: self.store.key_count(),
                request_rate: self.meter.rate(),
                max_keys: self.store.max_keys(),
                max_load: self.max_load,
            }),
        }
    }

    /// Accept loop: one task per connection, a ticker task publishing the
    /// request rate once per second.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        {
            let service = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(1));
                loop {
                    interval.tick().await;
                    service.meter.roll();
                }
            });
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let service = self.clone();
                    tokio::spawn(async move {
                        debug!(%peer, "peer connected");
                        service.handle_conn(stream).await;
                    });
                }
                Err(e) => warn!(%e, "accept failed"),
            }
        }
    }

    /// Serve requests on one connection until the peer closes it.
    async fn handle_conn(&self, mut stream: TcpStream) {
        loop {
            let request: NodeRequest = match read_frame(&mut stream).await {
                Ok(request) => request,
                Err(_) => break,
            };
            let response = self.handle(request).await;
            if write_frame(&mut stream, &response).await.is_err() {
                break;
            }
        }
    }
}

/// `krilld node` entrypoint.
pub async fn run(config: CliConfig) -> Result<()> {
    let service = NodeService::new(
        config.node.max_keys,
        config.node.max_load,
        Duration::from_millis(config.node.forward_timeout_ms),
    );
    let listener = TcpListener::bind(&config.node.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.node.listen_addr))?;
    info!(
        addr = %config.node.listen_addr,
        max_keys = config.node.max_keys,
        max_load = config.node.max_load,
        "storage node listening"
    );

    tokio::select! {
        () = service.serve(listener) => {}
        () = crate::shutdown_signal() => info!("storage node shutting down"),
    }
    Ok(())
}
