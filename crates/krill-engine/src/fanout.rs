//! Concurrent fan-out of per-replica calls.

use std::future::Future;
use std::sync::Arc;

use krill_net::{NetError, NodeClient};
use krill_types::NodeAddr;
use tokio::sync::mpsc;

/// Outcome of one replica call, tagged with the replica it came from.
pub(crate) struct ReplicaOutcome<T> {
    pub node: NodeAddr,
    pub result: Result<T, NetError>,
}

/// Dispatch one call per replica and stream outcomes in arrival order.
///
/// Each call runs on its own task. The channel holds one slot per replica,
/// so a task's send always completes immediately: dropping the receiver
/// (quorum early exit) abandons the remaining outcomes without blocking or
/// cancelling the in-flight calls.
pub(crate) fn fan_out<T, F, Fut>(
    client: &Arc<dyn NodeClient>,
    replicas: &[NodeAddr],
    call: F,
) -> mpsc::Receiver<ReplicaOutcome<T>>
where
    T: Send + 'static,
    F: Fn(Arc<dyn NodeClient>, NodeAddr) -> Fut,
    Fut: Future<Output = Result<T, NetError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(replicas.len().max(1));
    for node in replicas {
        let tx = tx.clone();
        let node = node.clone();
        let fut = call(Arc::clone(client), node.clone());
        tokio::spawn(async move {
            let result = fut.await;
            let _ = tx.send(ReplicaOutcome { node, result }).await;
        });
    }
    rx
}
