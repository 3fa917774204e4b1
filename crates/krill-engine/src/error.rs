//! Error types for the replication engine.

use krill_net::NetError;
use krill_types::NodeAddr;

/// Errors surfaced by the replication engine.
///
/// Transport failures and structured remote refusals both count as "one
/// replica did not ack"; the variants below describe what that meant for
/// the strategy in effect.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The ring produced no replicas — the cluster has no nodes.
    #[error("no replicas available: the ring is empty")]
    NoReplicas,

    /// A replica failed a call the strategy cannot tolerate.
    #[error("replica {node} failed: {source}")]
    ReplicaFailed {
        /// The replica that failed.
        node: NodeAddr,
        /// What went wrong on that call.
        #[source]
        source: NetError,
    },

    /// The primary write failed; backups were not contacted.
    #[error("primary write to {node} failed: {source}")]
    PrimaryFailed {
        /// The primary replica.
        node: NodeAddr,
        /// What went wrong on that call.
        #[source]
        source: NetError,
    },

    /// Every replica failed a failover read.
    #[error("all {attempted} replicas failed, last {node}: {source}")]
    AllReplicasFailed {
        /// How many replicas were tried.
        attempted: usize,
        /// The last replica tried.
        node: NodeAddr,
        /// The last failure.
        #[source]
        source: NetError,
    },

    /// Too many replicas failed for a majority write to succeed.
    #[error("quorum write failed: {acks} acks, {required} required")]
    QuorumWriteFailed {
        /// Acks received before the write became unwinnable.
        acks: usize,
        /// The majority threshold.
        required: usize,
    },

    /// No value was reported by enough replicas to satisfy a quorum read.
    #[error("quorum read failed: no value reached {required} matching replies")]
    NoConsensus {
        /// The majority threshold.
        required: usize,
    },
}
