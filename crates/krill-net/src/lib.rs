//! Wire protocol and node RPC transport for Krill.
//!
//! This crate defines:
//!
//! - [`NodeRequest`]/[`NodeResponse`] — the protocol storage nodes speak
//!   (postcard payloads behind a 4-byte length prefix).
//! - [`NodeClient`] — the capability the replication engine calls through,
//!   abstracted as a trait so tests can substitute an in-process cluster.
//! - [`TcpNodeClient`] — the production implementation: dial, one call,
//!   close, with a configurable deadline.

mod error;
mod message;
#[cfg(test)]
mod tests;
mod transport;

pub use error::NetError;
pub use message::{GetReply, NodeRequest, NodeResponse, NodeStats, join_chain, split_chain};
pub use transport::{MAX_FRAME_SIZE, TcpNodeClient, read_frame, write_frame};

use krill_types::NodeAddr;

/// A single remote invocation against a storage node.
///
/// Semantics are "dial, call, close": each call either completes with a
/// reply or yields an error, errors are opaque to the engine (it inspects
/// only presence or absence), and the transport never retries — retry
/// policy lives in the replication engine.
#[async_trait::async_trait]
pub trait NodeClient: Send + Sync {
    /// Store `key = value` on `node`. A non-empty `forward_to` instructs
    /// the node to forward the write down the chain before replying.
    async fn put(
        &self,
        node: &NodeAddr,
        key: &str,
        value: &str,
        forward_to: &str,
    ) -> Result<(), NetError>;

    /// Read `key` from `node`.
    async fn get(&self, node: &NodeAddr, key: &str) -> Result<GetReply, NetError>;

    /// Fetch the node's metrics snapshot.
    async fn stats(&self, node: &NodeAddr) -> Result<NodeStats, NetError>;
}
