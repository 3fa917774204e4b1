//! Shared test fixtures: an in-process cluster behind a mock
//! [`NodeClient`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use krill_net::{GetReply, NetError, NodeClient, NodeStats, split_chain};
use krill_ring::Ring;
use krill_types::{NodeAddr, ReplicationMode};

use crate::ReplicationEngine;

/// Default three-node cluster used by most tests.
pub const NODES: [&str; 3] = ["10.0.0.1:7401", "10.0.0.2:7401", "10.0.0.3:7401"];

/// One simulated storage node.
#[derive(Default)]
pub struct MockNode {
    data: Mutex<HashMap<String, String>>,
    /// When set, every call errors without touching data.
    fail: AtomicBool,
    /// When set, calls park forever — for observing early-exit behavior.
    stall: AtomicBool,
    /// Calls this node has received, including failed and parked ones.
    calls: AtomicUsize,
}

/// An in-process cluster that implements [`NodeClient`] directly.
///
/// Chain forwarding is emulated the way a real node does it: apply the
/// write locally first, then forward the remaining suffix to the next hop
/// and relay its result.
pub struct MockCluster {
    nodes: HashMap<NodeAddr, Arc<MockNode>>,
}

impl MockCluster {
    pub fn new(addrs: &[&str]) -> Arc<Self> {
        let nodes = addrs
            .iter()
            .map(|a| (NodeAddr::from(*a), Arc::new(MockNode::default())))
            .collect();
        Arc::new(Self { nodes })
    }

    fn node(&self, addr: &NodeAddr) -> &Arc<MockNode> {
        self.nodes.get(addr).expect("unknown node in mock cluster")
    }

    /// Make every future call to `addr` fail.
    pub fn fail(&self, addr: &NodeAddr) {
        self.node(addr).fail.store(true, Ordering::SeqCst);
    }

    /// Make every future call to `addr` park forever.
    pub fn stall(&self, addr: &NodeAddr) {
        self.node(addr).stall.store(true, Ordering::SeqCst);
    }

    /// Write directly into a node's map, bypassing the transport and the
    /// call counters. Used to fabricate divergent replica states.
    pub fn seed(&self, addr: &NodeAddr, key: &str, value: &str) {
        self.node(addr)
            .data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// The value `addr` holds for `key`, read directly.
    pub fn value_on(&self, addr: &NodeAddr, key: &str) -> Option<String> {
        self.node(addr).data.lock().unwrap().get(key).cloned()
    }

    /// Calls `addr` has received so far.
    pub fn calls_to(&self, addr: &NodeAddr) -> usize {
        self.node(addr).calls.load(Ordering::SeqCst)
    }

    /// Calls received across the whole cluster.
    pub fn total_calls(&self) -> usize {
        self.nodes
            .values()
            .map(|n| n.calls.load(Ordering::SeqCst))
            .sum()
    }

    /// Record a call and apply the failure/stall knobs.
    async fn admit(&self, addr: &NodeAddr) -> Result<&Arc<MockNode>, NetError> {
        let node = self.node(addr);
        node.calls.fetch_add(1, Ordering::SeqCst);
        if node.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if node.fail.load(Ordering::SeqCst) {
            return Err(NetError::Remote("injected failure".to_string()));
        }
        Ok(node)
    }
}

#[async_trait]
impl NodeClient for MockCluster {
    async fn put(
        &self,
        node: &NodeAddr,
        key: &str,
        value: &str,
        forward_to: &str,
    ) -> Result<(), NetError> {
        let target = self.admit(node).await?;
        target
            .data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());

        if !forward_to.is_empty() {
            let (next, rest) = split_chain(forward_to);
            let next = NodeAddr::from(next);
            return self.put(&next, key, value, rest).await;
        }
        Ok(())
    }

    async fn get(&self, node: &NodeAddr, key: &str) -> Result<GetReply, NetError> {
        let target = self.admit(node).await?;
        let value = target.data.lock().unwrap().get(key).cloned();
        Ok(match value {
            Some(value) => GetReply { value, found: true },
            None => GetReply::default(),
        })
    }

    async fn stats(&self, node: &NodeAddr) -> Result<NodeStats, NetError> {
        let target = self.admit(node).await?;
        Ok(NodeStats {
            key_count: target.data.lock().unwrap().len(),
            ..NodeStats::default()
        })
    }
}

/// Build an engine over a mock cluster with the given addresses.
pub fn engine_over(
    addrs: &[&str],
    mode: ReplicationMode,
) -> (ReplicationEngine, Arc<MockCluster>) {
    let cluster = MockCluster::new(addrs);
    let nodes: Vec<NodeAddr> = addrs.iter().map(|a| NodeAddr::from(*a)).collect();
    let ring = Ring::build(&nodes, 20);
    let client: Arc<dyn NodeClient> = cluster.clone();
    (ReplicationEngine::new(ring, mode, client), cluster)
}

/// Build a three-node engine with the default addresses.
pub fn three_node_engine(mode: ReplicationMode) -> (ReplicationEngine, Arc<MockCluster>) {
    engine_over(&NODES, mode)
}

/// The replica set the engine will use for `key`, in order.
pub fn replica_order(engine: &ReplicationEngine, key: &str) -> Vec<NodeAddr> {
    engine.ring().replicas(key, engine.replication_factor())
}

/// Poll until `cond` holds, panicking after one second.
pub async fn eventually(cond: impl Fn() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline");
}
