//! Node-local in-memory key-value storage.
//!
//! Each storage node owns one [`KvStore`] (the map clients' data lands in)
//! and one [`LoadMeter`] (a one-second request-rate counter surfaced through
//! the stats RPC). Both are internally synchronized; the node daemon shares
//! them freely across connection tasks.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Errors returned by the node-local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The node is at its configured key ceiling and the key is new.
    #[error("node full: max keys {max_keys} reached")]
    Full {
        /// The configured ceiling.
        max_keys: usize,
    },
}

/// Thread-safe in-memory map with an optional key-count ceiling.
///
/// Writes are last-writer-wins by arrival order at this node. Existing keys
/// may always be overwritten; new keys are refused once `max_keys` is
/// reached.
pub struct KvStore {
    data: RwLock<HashMap<String, String>>,
    max_keys: usize,
}

impl KvStore {
    /// Create a store. `max_keys = 0` disables the ceiling.
    pub fn new(max_keys: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            max_keys,
        }
    }

    /// Store `key = value`, last writer wins.
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().expect("lock poisoned");
        if self.max_keys > 0 && data.len() >= self.max_keys && !data.contains_key(key) {
            return Err(StoreError::Full {
                max_keys: self.max_keys,
            });
        }
        data.insert(key.to_string(), value.to_string());
        debug!(key, "stored value");
        Ok(())
    }

    /// The value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().expect("lock poisoned").get(key).cloned()
    }

    /// Number of keys currently held.
    pub fn key_count(&self) -> usize {
        self.data.read().expect("lock poisoned").len()
    }

    /// The configured key ceiling; 0 means unlimited.
    pub fn max_keys(&self) -> usize {
        self.max_keys
    }
}

/// One-second sliding request meter.
///
/// [`record`](LoadMeter::record) counts a served request;
/// [`roll`](LoadMeter::roll) publishes the window's count as the current
/// rate and resets the window. The node daemon calls `roll` once per second.
#[derive(Debug, Default)]
pub struct LoadMeter {
    window: AtomicU64,
    rate: AtomicU64,
}

impl LoadMeter {
    /// Create a meter with an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one served request.
    pub fn record(&self) {
        self.window.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the current window as the rate and start a new window.
    pub fn roll(&self) {
        let n = self.window.swap(0, Ordering::Relaxed);
        self.rate.store(n, Ordering::Relaxed);
    }

    /// Requests served during the last completed window.
    pub fn rate(&self) -> u64 {
        self.rate.load(Ordering::Relaxed)
    }
}
