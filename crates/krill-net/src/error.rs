//! Error types for node calls.

use std::io;

/// Errors that can occur during a node call.
///
/// The replication engine treats every variant the same way — "this replica
/// did not ack" — and inspects only success or failure. The detail is for
/// logs and for the error the coordinator ultimately reports.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Could not reach the node.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Address that was dialed.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// I/O failure mid-call.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Frame exceeded the size limit.
    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge {
        /// Declared or actual payload length.
        len: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// The node replied with a structured failure (e.g. a capacity refusal).
    #[error("remote error: {0}")]
    Remote(String),

    /// The node replied with a response the call did not expect.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The call did not complete within the configured deadline.
    #[error("call to {addr} timed out after {timeout_ms} ms")]
    Timeout {
        /// Address that was dialed.
        addr: String,
        /// The deadline that expired.
        timeout_ms: u64,
    },
}
