//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use veracity_types::ProtocolParams;

use crate::NodeError;

/// Configuration for a Veracity node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Stable identifier for this node.
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Byzantine fault tolerance `f` (network size `3f + 1`).
    #[serde(default = "default_fault_tolerance")]
    pub fault_tolerance: u32,

    /// Seconds a consensus round may stall before a view change.
    #[serde(default = "default_round_timeout")]
    pub round_timeout_secs: u64,

    /// View changes before a proposal is abandoned.
    #[serde(default = "default_max_view_changes")]
    pub max_view_changes: u32,

    /// Soundness error accepted when verifying proofs.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Probabilistic verification trials per proof check.
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,

    /// Whether this node opts in to content verification.
    #[serde(default = "default_true")]
    pub enable_verification: bool,

    /// Topics this node claims specialty in.
    #[serde(default)]
    pub specialties: Vec<String>,

    /// Concurrent verification capacity.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_id() -> String {
    "node-0".to_string()
}

fn default_fault_tolerance() -> u32 {
    ProtocolParams::network_defaults().fault_tolerance
}

fn default_round_timeout() -> u64 {
    ProtocolParams::network_defaults().round_timeout_secs
}

fn default_max_view_changes() -> u32 {
    ProtocolParams::network_defaults().max_view_changes
}

fn default_epsilon() -> f64 {
    ProtocolParams::network_defaults().epsilon
}

fn default_sample_count() -> u32 {
    ProtocolParams::network_defaults().sample_count
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> u32 {
    16
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config uses defaults")
    }
}

impl NodeConfig {
    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Protocol parameters derived from this configuration.
    pub fn params(&self) -> ProtocolParams {
        let mut params = ProtocolParams::network_defaults();
        params.fault_tolerance = self.fault_tolerance;
        params.round_timeout_secs = self.round_timeout_secs;
        params.max_view_changes = self.max_view_changes;
        params.epsilon = self.epsilon;
        params.sample_count = self.sample_count;
        params
    }
}
