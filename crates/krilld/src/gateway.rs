//! HTTP gateway — the client-facing face of the coordinator.
//!
//! Endpoints:
//!
//! - `GET /put?key=K&value=V` — write through the replication engine.
//! - `GET /get?key=K` — read through the replication engine.
//! - `GET /status` — cluster snapshot for dashboards: mode, membership,
//!   and per-node metrics gathered over the stats RPC.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use krill_engine::ReplicationEngine;
use krill_net::NodeClient;
use krill_types::NodeAddr;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Shared state for gateway handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<ReplicationEngine>,
    /// Client used for the stats sweep; same transport the engine routes
    /// through.
    client: Arc<dyn NodeClient>,
    nodes: Arc<[NodeAddr]>,
}

/// The coordinator's HTTP server.
pub struct Gateway {
    router: Router,
}

impl Gateway {
    /// Build a gateway over the given engine and node list.
    pub fn new(
        engine: Arc<ReplicationEngine>,
        client: Arc<dyn NodeClient>,
        nodes: Vec<NodeAddr>,
    ) -> Self {
        let state = AppState {
            engine,
            client,
            nodes: nodes.into(),
        };
        let router = Router::new()
            .route("/put", get(put_handler))
            .route("/get", get(get_handler))
            .route("/status", get(status_handler))
            .with_state(state);
        Self { router }
    }

    /// Return the inner [`Router`] (useful for in-process tests).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the gateway with graceful shutdown triggered by the given
    /// future.
    pub async fn serve_with_shutdown(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(addr, "gateway listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[derive(Deserialize)]
struct PutParams {
    key: Option<String>,
    value: Option<String>,
}

async fn put_handler(
    State(state): State<AppState>,
    Query(params): Query<PutParams>,
) -> (StatusCode, String) {
    let (Some(key), Some(value)) = (params.key, params.value) else {
        return (StatusCode::BAD_REQUEST, "missing params".to_string());
    };
    match state.engine.put(&key, &value).await {
        Ok(()) => (
            StatusCode::OK,
            format!("OK (mode: {})\n", state.engine.mode()),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Deserialize)]
struct GetParams {
    key: Option<String>,
}

async fn get_handler(
    State(state): State<AppState>,
    Query(params): Query<GetParams>,
) -> (StatusCode, String) {
    let Some(key) = params.key else {
        return (StatusCode::BAD_REQUEST, "missing params".to_string());
    };
    match state.engine.get(&key).await {
        Ok(reply) if reply.found => (StatusCode::OK, format!("{}\n", reply.value)),
        Ok(_) => (StatusCode::NOT_FOUND, "not found".to_string()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Cluster snapshot served at `/status`.
#[derive(Serialize)]
struct StatusResponse {
    mode: String,
    nodes: Vec<String>,
    replication_factor: usize,
    config: StatusConfig,
    stats: Vec<NodeStatus>,
}

#[derive(Serialize)]
struct StatusConfig {
    replicas: usize,
}

/// Per-node entry in the status snapshot. Unreachable nodes are reported
/// with zeroed counters rather than omitted.
#[derive(Serialize)]
struct NodeStatus {
    addr: String,
    reachable: bool,
    key_count: usize,
    request_rate: u64,
    max_keys: usize,
    max_load: u64,
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut stats = Vec::with_capacity(state.nodes.len());
    for node in state.nodes.iter() {
        let status = match state.client.stats(node).await {
            Ok(s) => NodeStatus {
                addr: node.to_string(),
                reachable: true,
                key_count: s.key_count,
                request_rate: s.request_rate,
                max_keys: s.max_keys,
                max_load: s.max_load,
            },
            Err(_) => NodeStatus {
                addr: node.to_string(),
                reachable: false,
                key_count: 0,
                request_rate: 0,
                max_keys: 0,
                max_load: 0,
            },
        };
        stats.push(status);
    }

    Json(StatusResponse {
        mode: state.engine.mode().to_string(),
        nodes: state.nodes.iter().map(|n| n.to_string()).collect(),
        replication_factor: state.engine.replication_factor(),
        config: StatusConfig {
            replicas: state.engine.ring().replicas_per_node(),
        },
        stats,
    })
}
