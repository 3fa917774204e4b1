//! Wire protocol spoken by storage nodes.
//!
//! The coordinator's RPC port understands the same `Put`/`Get` shapes, so a
//! single client type can talk to either tier.

use krill_types::NodeAddr;
use serde::{Deserialize, Serialize};

/// A request sent to a storage node.
///
/// Each request is one length-prefixed postcard frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRequest {
    /// Store a key-value pair.
    ///
    /// `forward_to` carries the remaining chain suffix (`"addr2,addr3"`)
    /// when chain replication is in effect; empty for a plain write. The
    /// receiving node applies the write locally first, then forwards to the
    /// next hop and relays its result.
    Put {
        /// Key to store.
        key: String,
        /// Value to store.
        value: String,
        /// Comma-joined addresses of the rest of the chain; empty when the
        /// write terminates here.
        forward_to: String,
    },

    /// Fetch the value stored under `key`.
    Get {
        /// Key to look up.
        key: String,
    },

    /// Fetch the node's key count and load counters.
    Stats,
}

/// A reply from a storage node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeResponse {
    /// The write (and any chain suffix behind it) was applied.
    PutOk,

    /// Result of a `Get`: the stored value, if any.
    Value {
        /// Stored value; empty when `found` is false.
        value: String,
        /// Whether the key was present.
        found: bool,
    },

    /// Node metrics snapshot.
    Stats(NodeStats),

    /// The node refused or failed the request.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

/// Reply to a `Get` call, as seen by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetReply {
    /// Stored value; empty when `found` is false.
    pub value: String,
    /// Whether the key was present.
    pub found: bool,
}

/// Point-in-time metrics reported by a storage node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Number of keys currently held.
    pub key_count: usize,
    /// Requests served during the last one-second window.
    pub request_rate: u64,
    /// Configured key ceiling; 0 means unlimited.
    pub max_keys: usize,
    /// Configured request-rate ceiling; 0 means unlimited. Reported for
    /// operators, not enforced.
    pub max_load: u64,
}

/// Split a chain suffix at the first comma into the next hop and the
/// remaining suffix.
///
/// `"b,c,d"` → `("b", "c,d")`; `"b"` → `("b", "")`.
pub fn split_chain(forward_to: &str) -> (&str, &str) {
    match forward_to.split_once(',') {
        Some((next, rest)) => (next, rest),
        None => (forward_to, ""),
    }
}

/// Join replica addresses into a chain suffix for the head write.
pub fn join_chain(replicas: &[NodeAddr]) -> String {
    replicas
        .iter()
        .map(NodeAddr::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
