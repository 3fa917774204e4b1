//! Per-call TCP transport with length-prefixed postcard frames.

use std::time::Duration;

use krill_types::NodeAddr;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::NetError;
use crate::message::{GetReply, NodeRequest, NodeResponse, NodeStats};
use crate::NodeClient;

/// Maximum frame size: 16 MB. Values are short strings, but the ceiling
/// keeps a corrupt length prefix from allocating unbounded memory.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default per-call deadline.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP implementation of [`NodeClient`]: dial, one request/response, close.
///
/// Every call opens a fresh connection; nothing is pooled and nothing is
/// retried. Retry policy belongs to the replication engine, not the
/// transport.
#[derive(Debug, Clone)]
pub struct TcpNodeClient {
    call_timeout: Duration,
}

impl TcpNodeClient {
    /// Create a client with the default per-call deadline.
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Create a client with an explicit per-call deadline.
    ///
    /// The deadline covers the whole call: connect, send, and reply.
    pub fn with_call_timeout(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    /// Dial `node`, issue one request, read one response, and close.
    async fn call(&self, node: &NodeAddr, request: &NodeRequest) -> Result<NodeResponse, NetError> {
        let exchange = async {
            let mut stream =
                TcpStream::connect(node.as_str())
                    .await
                    .map_err(|source| NetError::Connect {
                        addr: node.to_string(),
                        source,
                    })?;
            write_frame(&mut stream, request).await?;
            read_frame::<NodeResponse, _>(&mut stream).await
        };

        match timeout(self.call_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(node = %node, timeout_ms = self.call_timeout.as_millis() as u64, "node call timed out");
                Err(NetError::Timeout {
                    addr: node.to_string(),
                    timeout_ms: self.call_timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl Default for TcpNodeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NodeClient for TcpNodeClient {
    async fn put(
        &self,
        node: &NodeAddr,
        key: &str,
        value: &str,
        forward_to: &str,
    ) -> Result<(), NetError> {
        let request = NodeRequest::Put {
            key: key.to_string(),
            value: value.to_string(),
            forward_to: forward_to.to_string(),
        };
        match self.call(node, &request).await? {
            NodeResponse::PutOk => Ok(()),
            NodeResponse::Error { message } => Err(NetError::Remote(message)),
            other => Err(NetError::UnexpectedResponse(format!("{other:?}"))),
        }
    }

    async fn get(&self, node: &NodeAddr, key: &str) -> Result<GetReply, NetError> {
        let request = NodeRequest::Get {
            key: key.to_string(),
        };
        match self.call(node, &request).await? {
            NodeResponse::Value { value, found } => Ok(GetReply { value, found }),
            NodeResponse::Error { message } => Err(NetError::Remote(message)),
            other => Err(NetError::UnexpectedResponse(format!("{other:?}"))),
        }
    }

    async fn stats(&self, node: &NodeAddr) -> Result<NodeStats, NetError> {
        match self.call(node, &NodeRequest::Stats).await? {
            NodeResponse::Stats(stats) => Ok(stats),
            NodeResponse::Error { message } => Err(NetError::Remote(message)),
            other => Err(NetError::UnexpectedResponse(format!("{other:?}"))),
        }
    }
}

/// Write one frame: a 4-byte big-endian length prefix followed by the
/// postcard-encoded payload.
pub async fn write_frame<T, W>(stream: &mut W, message: &T) -> Result<(), NetError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let payload = postcard::to_allocvec(message).map_err(|e| NetError::Codec(e.to_string()))?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    stream.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one length-prefixed postcard frame.
pub async fn read_frame<T, R>(stream: &mut R) -> Result<T, NetError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    postcard::from_bytes(&payload).map_err(|e| NetError::Codec(e.to_string()))
}
