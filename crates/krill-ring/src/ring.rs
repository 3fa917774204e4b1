//! Ring construction and replica lookup.

use krill_types::NodeAddr;
use tracing::debug;

/// Consistent hashing ring for deterministic key placement.
///
/// Each node is mapped to `replicas_per_node` virtual tokens on a u32 ring.
/// A key's replica set is found by walking clockwise from the key's position
/// until enough distinct physical nodes are collected.
///
/// The ring is built once from a fixed node set and is immutable afterwards;
/// lookups are pure functions of `(tokens, key, n)` and need no
/// synchronization.
#[derive(Debug, Clone)]
pub struct Ring {
    /// Virtual token positions, sorted ascending by hash. Equal hashes keep
    /// their insertion order (stable sort), which makes tie-breaking
    /// deterministic and observable in the walk.
    tokens: Vec<(u32, NodeAddr)>,
    /// Number of distinct physical nodes behind the tokens.
    node_count: usize,
    /// Virtual tokens contributed by each node.
    replicas_per_node: usize,
}

impl Ring {
    /// Build a ring from a node list.
    ///
    /// Each distinct node gets `replicas_per_node` tokens at
    /// `crc32_ieee(decimal(i) ++ addr)` for `i` in `0..replicas_per_node`.
    /// Duplicate addresses in `nodes` are ignored after their first
    /// occurrence, so `tokens.len() == replicas_per_node * distinct nodes`.
    pub fn build(nodes: &[NodeAddr], replicas_per_node: usize) -> Self {
        let mut distinct: Vec<&NodeAddr> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !distinct.contains(&node) {
                distinct.push(node);
            }
        }

        let mut tokens = Vec::with_capacity(distinct.len() * replicas_per_node);
        for node in &distinct {
            for i in 0..replicas_per_node {
                let hash = crc32fast::hash(format!("{i}{node}").as_bytes());
                tokens.push((hash, (*node).clone()));
            }
        }
        tokens.sort_by_key(|(hash, _)| *hash);

        debug!(
            nodes = distinct.len(),
            tokens = tokens.len(),
            "built placement ring"
        );

        Self {
            tokens,
            node_count: distinct.len(),
            replicas_per_node,
        }
    }

    /// Number of distinct physical nodes on the ring.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Total number of virtual tokens on the ring.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Virtual tokens contributed by each node.
    pub fn replicas_per_node(&self) -> usize {
        self.replicas_per_node
    }

    /// The ordered replica set for `key`: up to `n` distinct nodes, walking
    /// clockwise from the key's ring position.
    ///
    /// Index 0 is the head/primary, the last element the tail. Returns
    /// `min(n, node_count)` nodes; empty when the ring is empty or `n` is 0.
    pub fn replicas(&self, key: &str, n: usize) -> Vec<NodeAddr> {
        if self.tokens.is_empty() || n == 0 {
            return Vec::new();
        }

        let hash = crc32fast::hash(key.as_bytes());
        // First token at or after the key's position, wrapping to 0.
        let start = self.tokens.partition_point(|(h, _)| *h < hash);
        let start = if start == self.tokens.len() { 0 } else { start };

        let want = n.min(self.node_count);
        let mut replicas: Vec<NodeAddr> = Vec::with_capacity(want);

        let (after, before) = self.tokens.split_at(start);
        for (_, node) in after.iter().chain(before.iter()) {
            if !replicas.contains(node) {
                replicas.push(node.clone());
                if replicas.len() == want {
                    break;
                }
            }
        }

        replicas
    }
}
