//! Strict-sync mode: write everywhere, wait for all; failover reads.

use krill_types::ReplicationMode;

use crate::EngineError;
use crate::tests::helpers::*;

#[tokio::test]
async fn test_put_reaches_every_replica() {
    let (engine, cluster) = three_node_engine(ReplicationMode::Sync);

    engine.put("user:1", "Alice").await.unwrap();

    // Every replica holds the value individually.
    for node in replica_order(&engine, "user:1") {
        assert_eq!(
            cluster.value_on(&node, "user:1"),
            Some("Alice".to_string()),
            "replica {node} missing the value"
        );
    }

    let reply = engine.get("user:1").await.unwrap();
    assert_eq!(reply.value, "Alice");
    assert!(reply.found);
}

#[tokio::test]
async fn test_put_fails_when_one_replica_is_down_but_read_survives() {
    let (engine, cluster) = three_node_engine(ReplicationMode::Sync);
    let replicas = replica_order(&engine, "user:1");
    cluster.fail(&replicas[1]);

    let err = engine.put("user:1", "Alice").await.unwrap_err();
    assert!(matches!(err, EngineError::ReplicaFailed { .. }));

    // No short-circuit: the healthy replicas were still written.
    assert_eq!(
        cluster.value_on(&replicas[0], "user:1"),
        Some("Alice".to_string())
    );
    assert_eq!(
        cluster.value_on(&replicas[2], "user:1"),
        Some("Alice".to_string())
    );
    assert_eq!(cluster.value_on(&replicas[1], "user:1"), None);

    // A failover read still finds the value on a live replica.
    let reply = engine.get("user:1").await.unwrap();
    assert_eq!(reply.value, "Alice");
    assert!(reply.found);
}

#[tokio::test]
async fn test_every_replica_attempted_even_when_one_fails() {
    let (engine, cluster) = three_node_engine(ReplicationMode::Sync);
    let replicas = replica_order(&engine, "user:1");
    cluster.fail(&replicas[0]);

    engine.put("user:1", "Alice").await.unwrap_err();

    for node in &replicas {
        assert_eq!(cluster.calls_to(node), 1, "replica {node} was not attempted");
    }
}

#[tokio::test]
async fn test_put_fails_when_all_replicas_are_down() {
    let (engine, cluster) = three_node_engine(ReplicationMode::Sync);
    for node in replica_order(&engine, "user:1") {
        cluster.fail(&node);
    }

    assert!(engine.put("user:1", "Alice").await.is_err());

    let err = engine.get("user:1").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::AllReplicasFailed { attempted: 3, .. }
    ));
}

#[tokio::test]
async fn test_get_missing_key_reports_not_found() {
    let (engine, _cluster) = three_node_engine(ReplicationMode::Sync);

    // Unlike quorum mode, an absent key is an ordinary not-found reply.
    let reply = engine.get("user:99").await.unwrap();
    assert!(!reply.found);
    assert!(reply.value.is_empty());
}
