//! Loopback tests for the TCP transport and frame codec.

use std::time::Duration;

use krill_types::NodeAddr;
use tokio::net::TcpListener;

use crate::{
    GetReply, NetError, NodeClient, NodeRequest, NodeResponse, NodeStats, TcpNodeClient,
    read_frame, write_frame,
};

/// Spawn a one-shot node that answers every request with `reply`.
async fn spawn_node(reply: NodeResponse) -> NodeAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let reply = reply.clone();
            tokio::spawn(async move {
                if read_frame::<NodeRequest, _>(&mut stream).await.is_ok() {
                    let _ = write_frame(&mut stream, &reply).await;
                }
            });
        }
    });
    NodeAddr::from(addr.to_string())
}

#[tokio::test]
async fn test_put_roundtrip() {
    let node = spawn_node(NodeResponse::PutOk).await;
    let client = TcpNodeClient::new();
    client.put(&node, "user:1", "Alice", "").await.unwrap();
}

#[tokio::test]
async fn test_get_roundtrip() {
    let node = spawn_node(NodeResponse::Value {
        value: "Alice".to_string(),
        found: true,
    })
    .await;
    let client = TcpNodeClient::new();
    let reply = client.get(&node, "user:1").await.unwrap();
    assert_eq!(
        reply,
        GetReply {
            value: "Alice".to_string(),
            found: true
        }
    );
}

#[tokio::test]
async fn test_stats_roundtrip() {
    let stats = NodeStats {
        key_count: 7,
        request_rate: 42,
        max_keys: 100,
        max_load: 0,
    };
    let node = spawn_node(NodeResponse::Stats(stats)).await;
    let client = TcpNodeClient::new();
    assert_eq!(client.stats(&node).await.unwrap(), stats);
}

#[tokio::test]
async fn test_remote_error_surfaces_as_remote() {
    let node = spawn_node(NodeResponse::Error {
        message: "node full: max keys 10 reached".to_string(),
    })
    .await;
    let client = TcpNodeClient::new();
    let err = client.put(&node, "k", "v", "").await.unwrap_err();
    assert!(matches!(err, NetError::Remote(ref m) if m.contains("node full")));
}

#[tokio::test]
async fn test_unexpected_response_rejected() {
    // A node that answers Get with PutOk is broken; the client must not
    // silently coerce it.
    let node = spawn_node(NodeResponse::PutOk).await;
    let client = TcpNodeClient::new();
    let err = client.get(&node, "k").await.unwrap_err();
    assert!(matches!(err, NetError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn test_call_times_out_against_silent_node() {
    // Accepts connections but never replies.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = NodeAddr::from(listener.local_addr().unwrap().to_string());
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            // Hold the connection open without answering.
            std::mem::forget(stream);
        }
    });

    let client = TcpNodeClient::with_call_timeout(Duration::from_millis(100));
    let err = client.put(&addr, "k", "v", "").await.unwrap_err();
    assert!(matches!(err, NetError::Timeout { .. }));
}

#[tokio::test]
async fn test_connect_error_against_dead_node() {
    // Bind and immediately drop to get an address nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = NodeAddr::from(listener.local_addr().unwrap().to_string());
    drop(listener);

    let client = TcpNodeClient::with_call_timeout(Duration::from_millis(500));
    let err = client.get(&addr, "k").await.unwrap_err();
    assert!(matches!(
        err,
        NetError::Connect { .. } | NetError::Timeout { .. }
    ));
}

#[tokio::test]
async fn test_frame_codec_roundtrip() {
    let (mut client_end, mut server_end) = tokio::io::duplex(1024);

    let request = NodeRequest::Get {
        key: "user:1".to_string(),
    };
    write_frame(&mut client_end, &request).await.unwrap();

    let decoded: NodeRequest = read_frame(&mut server_end).await.unwrap();
    assert_eq!(decoded, request);
}

#[tokio::test]
async fn test_oversized_length_prefix_rejected() {
    use tokio::io::AsyncWriteExt;

    let (mut client_end, mut server_end) = tokio::io::duplex(64);
    // Claim a payload far beyond the frame ceiling.
    client_end
        .write_all(&(u32::MAX).to_be_bytes())
        .await
        .unwrap();

    let err = read_frame::<NodeRequest, _>(&mut server_end)
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::FrameTooLarge { .. }));
}
