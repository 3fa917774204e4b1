//! Consistent hashing ring for deterministic key placement.
//!
//! This crate maps keys to ordered replica sets of storage nodes. Each node
//! contributes multiple virtual tokens on a u32 ring, positioned by
//! `crc32_ieee(decimal(i) ++ addr)`; a key lands at `crc32_ieee(key)` and its
//! replicas are the next distinct nodes walking clockwise.
//!
//! The hash function and its input encoding are part of the routing
//! contract: two coordinators built from the same node list and token count
//! route every key identically.

mod ring;

pub use ring::Ring;
