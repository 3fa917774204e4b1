//! Shared types for the Krill key-value cluster.
//!
//! This crate defines the vocabulary used across the workspace:
//! [`NodeAddr`] (storage node identity), [`ReplicationMode`] (the startup
//! strategy selector), and the cluster-wide derivations
//! [`replication_factor`] and [`quorum_threshold`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address of a storage node, typically `host:port`.
///
/// The address doubles as the node's identity: two addresses refer to the
/// same node iff the strings are equal. No structure is assumed beyond
/// "something the transport can dial".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddr(String);

impl NodeAddr {
    /// Create an address from anything string-like.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The underlying `host:port` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Replication strategy, selected at coordinator startup and fixed for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationMode {
    /// Write to every replica, wait for all; read with failover.
    #[default]
    Sync,
    /// Write to the primary, replicate to backups in the background;
    /// read with failover.
    Async,
    /// Write to the head, which forwards down the chain; read from the tail.
    Chain,
    /// Majority writes and majority-agreement reads.
    Quorum,
}

impl ReplicationMode {
    /// The lowercase name used on the CLI and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplicationMode::Sync => "sync",
            ReplicationMode::Async => "async",
            ReplicationMode::Chain => "chain",
            ReplicationMode::Quorum => "quorum",
        }
    }
}

impl fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown replication mode name.
#[derive(Debug, thiserror::Error)]
#[error("unknown replication mode: {0:?} (expected sync, async, chain, or quorum)")]
pub struct ParseModeError(String);

impl FromStr for ReplicationMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(ReplicationMode::Sync),
            "async" => Ok(ReplicationMode::Async),
            "chain" => Ok(ReplicationMode::Chain),
            "quorum" => Ok(ReplicationMode::Quorum),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Target replica-set size for a cluster of `node_count` nodes.
///
/// Three-way replication once the cluster is large enough, two-way for a
/// pair, and whatever is available below that. Computed once at startup.
pub fn replication_factor(node_count: usize) -> usize {
    match node_count {
        n if n >= 3 => 3,
        n => n,
    }
}

/// Majority threshold used for both quorum writes and quorum reads:
/// `⌊rf/2⌋ + 1`.
pub fn quorum_threshold(rf: usize) -> usize {
    rf / 2 + 1
}
