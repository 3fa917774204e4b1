//! Replication engine for the Krill coordinator.
//!
//! The [`ReplicationEngine`] resolves each key's replica set on the
//! placement ring and drives the write and read path for the mode the
//! coordinator was started with:
//!
//! - **sync** — write everywhere, wait for all; failover read.
//! - **async** — write the primary, replicate in the background; failover
//!   read.
//! - **chain** — write the head, nodes forward down the chain; tail read.
//! - **quorum** — majority writes and majority-agreement reads.
//!
//! The engine talks to storage nodes exclusively through the
//! [`NodeClient`](krill_net::NodeClient) trait, so tests run against an
//! in-process mock cluster instead of sockets.

mod engine;
mod error;
mod fanout;
#[cfg(test)]
mod tests;

pub use engine::ReplicationEngine;
pub use error::EngineError;
