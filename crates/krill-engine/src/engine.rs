//! [`ReplicationEngine`] — Put/Get across a replica set under the
//! configured mode.

use std::sync::Arc;

use krill_net::{GetReply, NodeClient, join_chain};
use krill_ring::Ring;
use krill_types::{NodeAddr, ReplicationMode, quorum_threshold, replication_factor};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::fanout::fan_out;

/// Routes client writes and reads across each key's replica set.
///
/// The ring, mode, and replication factor are fixed at construction and the
/// engine holds no other state, so a single instance serves concurrent
/// requests without synchronization. No replica call is made while any
/// coordinator-side lock is held — there are none.
pub struct ReplicationEngine {
    ring: Ring,
    mode: ReplicationMode,
    rf: usize,
    client: Arc<dyn NodeClient>,
}

impl ReplicationEngine {
    /// Create an engine over `ring`, talking through `client`.
    ///
    /// The replication factor is derived once from the ring's node count:
    /// 3 when the cluster has at least three nodes, otherwise the node
    /// count itself.
    pub fn new(ring: Ring, mode: ReplicationMode, client: Arc<dyn NodeClient>) -> Self {
        let rf = replication_factor(ring.node_count());
        Self {
            ring,
            mode,
            rf,
            client,
        }
    }

    /// The mode this engine was started with.
    pub fn mode(&self) -> ReplicationMode {
        self.mode
    }

    /// Target replica-set size.
    pub fn replication_factor(&self) -> usize {
        self.rf
    }

    /// The placement ring.
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// The ordered replica set for `key`.
    fn replicas(&self, key: &str) -> Result<Vec<NodeAddr>, EngineError> {
        let replicas = self.ring.replicas(key, self.rf);
        if replicas.is_empty() {
            return Err(EngineError::NoReplicas);
        }
        Ok(replicas)
    }

    /// Store `key = value` under the configured mode.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let replicas = self.replicas(key)?;
        debug!(key, mode = %self.mode, replicas = replicas.len(), "put");
        match self.mode {
            ReplicationMode::Sync => self.put_sync(&replicas, key, value).await,
            ReplicationMode::Async => self.put_async(&replicas, key, value).await,
            ReplicationMode::Chain => self.put_chain(&replicas, key, value).await,
            ReplicationMode::Quorum => self.put_quorum(&replicas, key, value).await,
        }
    }

    /// Read `key` under the configured mode.
    pub async fn get(&self, key: &str) -> Result<GetReply, EngineError> {
        let replicas = self.replicas(key)?;
        debug!(key, mode = %self.mode, replicas = replicas.len(), "get");
        match self.mode {
            ReplicationMode::Sync | ReplicationMode::Async => {
                self.get_failover(&replicas, key).await
            }
            ReplicationMode::Chain => self.get_tail(&replicas, key).await,
            ReplicationMode::Quorum => self.get_quorum(&replicas, key).await,
        }
    }

    // ------------------------------------------------------------------
    // Write strategies
    // ------------------------------------------------------------------

    /// Write to every replica and wait for all of them.
    ///
    /// Any failure fails the write, but the remaining replicas are still
    /// attempted — no short-circuit. The first error to arrive is the one
    /// surfaced.
    async fn put_sync(
        &self,
        replicas: &[NodeAddr],
        key: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let mut rx = fan_out(&self.client, replicas, |client, node| {
            let key = key.to_string();
            let value = value.to_string();
            async move { client.put(&node, &key, &value, "").await }
        });

        let mut first_error: Option<EngineError> = None;
        while let Some(outcome) = rx.recv().await {
            if let Err(source) = outcome.result {
                warn!(node = %outcome.node, %source, "sync write failed on replica");
                first_error.get_or_insert(EngineError::ReplicaFailed {
                    node: outcome.node,
                    source,
                });
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Write to the primary and acknowledge; replicate to the backups as
    /// fire-and-forget background tasks.
    ///
    /// The caller's success contract is "primary durable". If the primary
    /// fails, its error is surfaced and the backups are never contacted.
    async fn put_async(
        &self,
        replicas: &[NodeAddr],
        key: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let primary = &replicas[0];
        self.client
            .put(primary, key, value, "")
            .await
            .map_err(|source| EngineError::PrimaryFailed {
                node: primary.clone(),
                source,
            })?;

        for backup in &replicas[1..] {
            let client = Arc::clone(&self.client);
            let node = backup.clone();
            let key = key.to_string();
            let value = value.to_string();
            tokio::spawn(async move {
                if let Err(source) = client.put(&node, &key, &value, "").await {
                    warn!(%node, %source, "background replication to backup failed");
                }
            });
        }

        Ok(())
    }

    /// Write to the head carrying the rest of the replica set as a chain
    /// suffix; each node applies locally, then forwards synchronously.
    ///
    /// The head's reply is the chain's reply: success means every node in
    /// the chain acknowledged.
    async fn put_chain(
        &self,
        replicas: &[NodeAddr],
        key: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let head = &replicas[0];
        let forward_to = join_chain(&replicas[1..]);
        self.client
            .put(head, key, value, &forward_to)
            .await
            .map_err(|source| EngineError::ReplicaFailed {
                node: head.clone(),
                source,
            })
    }

    /// Write to all replicas, acknowledging once a majority has confirmed.
    ///
    /// Fails as soon as a majority becomes unreachable; stragglers finish
    /// in the background and their outcomes are dropped.
    async fn put_quorum(
        &self,
        replicas: &[NodeAddr],
        key: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let required = quorum_threshold(replicas.len());
        let mut rx = fan_out(&self.client, replicas, |client, node| {
            let key = key.to_string();
            let value = value.to_string();
            async move { client.put(&node, &key, &value, "").await }
        });

        let mut acks = 0usize;
        let mut failures = 0usize;
        while let Some(outcome) = rx.recv().await {
            match outcome.result {
                Ok(()) => {
                    acks += 1;
                    if acks >= required {
                        return Ok(());
                    }
                }
                Err(source) => {
                    warn!(node = %outcome.node, %source, "quorum write failed on replica");
                    failures += 1;
                    if failures > replicas.len() - required {
                        return Err(EngineError::QuorumWriteFailed { acks, required });
                    }
                }
            }
        }

        // With a non-empty replica set, either the ack or the failure
        // threshold trips before the queue drains.
        Err(EngineError::QuorumWriteFailed { acks, required })
    }

    // ------------------------------------------------------------------
    // Read strategies
    // ------------------------------------------------------------------

    /// Try replicas in order and return the first successful reply.
    async fn get_failover(
        &self,
        replicas: &[NodeAddr],
        key: &str,
    ) -> Result<GetReply, EngineError> {
        let mut last_error: Option<(NodeAddr, krill_net::NetError)> = None;
        for node in replicas {
            match self.client.get(node, key).await {
                Ok(reply) => return Ok(reply),
                Err(source) => {
                    debug!(%node, %source, "failover read: replica unavailable");
                    last_error = Some((node.clone(), source));
                }
            }
        }

        let (node, source) = last_error.expect("replica set checked non-empty");
        Err(EngineError::AllReplicasFailed {
            attempted: replicas.len(),
            node,
            source,
        })
    }

    /// Read from the chain tail — the last replica, which holds exactly the
    /// writes the head has acknowledged.
    async fn get_tail(&self, replicas: &[NodeAddr], key: &str) -> Result<GetReply, EngineError> {
        let tail = replicas.last().expect("replica set checked non-empty");
        self.client
            .get(tail, key)
            .await
            .map_err(|source| EngineError::ReplicaFailed {
                node: tail.clone(),
                source,
            })
    }

    /// Read from all replicas and require a majority to agree on one value.
    ///
    /// Errored replies and `found = false` replies are ignored; a key
    /// nobody holds therefore reads as "no consensus", not as absent.
    async fn get_quorum(&self, replicas: &[NodeAddr], key: &str) -> Result<GetReply, EngineError> {
        let required = quorum_threshold(replicas.len());
        let mut rx = fan_out(&self.client, replicas, |client, node| {
            let key = key.to_string();
            async move { client.get(&node, &key).await }
        });

        let mut tallies: Vec<(String, usize)> = Vec::new();
        while let Some(outcome) = rx.recv().await {
            let reply = match outcome.result {
                Ok(reply) => reply,
                Err(source) => {
                    debug!(node = %outcome.node, %source, "quorum read: replica unavailable");
                    continue;
                }
            };
            if !reply.found {
                continue;
            }

            let count = match tallies.iter_mut().find(|(value, _)| *value == reply.value) {
                Some((_, count)) => {
                    *count += 1;
                    *count
                }
                None => {
                    tallies.push((reply.value.clone(), 1));
                    1
                }
            };
            if count >= required {
                return Ok(GetReply {
                    value: reply.value,
                    found: true,
                });
            }
        }

        Err(EngineError::NoConsensus { required })
    }
}
