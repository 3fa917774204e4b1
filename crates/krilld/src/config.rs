//! TOML configuration for the Krill daemon.
//!
//! Every section has working defaults, so a bare `krilld node` or
//! `krilld coordinator --node ...` runs without a config file. CLI flags
//! override file values.

use std::path::Path;

use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Coordinator role settings.
    pub coordinator: CoordinatorSection,
    /// Storage node role settings.
    pub node: NodeSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[coordinator]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoordinatorSection {
    /// RPC listen address (speaks the node wire protocol).
    pub listen_addr: String,
    /// HTTP gateway listen address.
    pub http_addr: String,
    /// Replication mode: `sync`, `async`, `chain`, or `quorum`.
    pub mode: String,
    /// Storage node addresses (`host:port`). The ring is built from this
    /// list at startup and never changes afterwards.
    pub nodes: Vec<String>,
    /// Virtual tokens each node contributes to the placement ring.
    pub ring_replicas: usize,
    /// Per-call deadline for node RPCs, in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7400".to_string(),
            http_addr: "0.0.0.0:8080".to_string(),
            mode: "sync".to_string(),
            nodes: Vec::new(),
            ring_replicas: 20,
            call_timeout_ms: 5_000,
        }
    }
}

/// `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// RPC listen address.
    pub listen_addr: String,
    /// Maximum number of keys held; 0 means unlimited. Updates of existing
    /// keys are always accepted.
    pub max_keys: usize,
    /// Advisory request-rate ceiling reported in stats; 0 means unlimited.
    pub max_load: u64,
    /// Per-call deadline for chain forwarding, in milliseconds.
    pub forward_timeout_ms: u64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7401".to_string(),
            max_keys: 0,
            max_load: 0,
            forward_timeout_ms: 5_000,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[coordinator]
listen_addr = "127.0.0.1:7500"
http_addr = "127.0.0.1:8081"
mode = "quorum"
nodes = ["127.0.0.1:7501", "127.0.0.1:7502", "127.0.0.1:7503"]
ring_replicas = 40
call_timeout_ms = 2000

[node]
listen_addr = "127.0.0.1:7501"
max_keys = 1000
max_load = 500
forward_timeout_ms = 2000

[log]
level = "debug"
"#;

        let config = CliConfig::from_toml(toml).unwrap();
        assert_eq!(config.coordinator.listen_addr, "127.0.0.1:7500");
        assert_eq!(config.coordinator.http_addr, "127.0.0.1:8081");
        assert_eq!(config.coordinator.mode, "quorum");
        assert_eq!(config.coordinator.nodes.len(), 3);
        assert_eq!(config.coordinator.ring_replicas, 40);
        assert_eq!(config.coordinator.call_timeout_ms, 2000);
        assert_eq!(config.node.listen_addr, "127.0.0.1:7501");
        assert_eq!(config.node.max_keys, 1000);
        assert_eq!(config.node.max_load, 500);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = CliConfig::from_toml("").unwrap();
        assert_eq!(config.coordinator.listen_addr, "0.0.0.0:7400");
        assert_eq!(config.coordinator.http_addr, "0.0.0.0:8080");
        assert_eq!(config.coordinator.mode, "sync");
        assert!(config.coordinator.nodes.is_empty());
        assert_eq!(config.coordinator.ring_replicas, 20);
        assert_eq!(config.node.listen_addr, "0.0.0.0:7401");
        assert_eq!(config.node.max_keys, 0);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[coordinator]
mode = "chain"
nodes = ["a:7401"]
"#;
        let config = CliConfig::from_toml(toml).unwrap();
        assert_eq!(config.coordinator.mode, "chain");
        assert_eq!(config.coordinator.nodes, vec!["a:7401"]);
        // Unspecified fields keep their defaults.
        assert_eq!(config.coordinator.ring_replicas, 20);
        assert_eq!(config.node.listen_addr, "0.0.0.0:7401");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.coordinator.mode, "sync");
    }
}
