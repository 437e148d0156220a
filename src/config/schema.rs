//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a transfer run.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the orchestrator and its network clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReactionConfig {
    /// Networks in the order transfers are sent.
    pub networks: Vec<NetworkConfig>,

    /// RPC client settings shared by every network.
    pub rpc: RpcConfig,

    /// Confirmation polling settings.
    pub confirmation: ConfirmationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            networks: default_networks(),
            rpc: RpcConfig::default(),
            confirmation: ConfirmationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A single network the transfer is replayed on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Unique, human-readable network name. Used as the status lookup key.
    pub name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order for read calls.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 11155111 for Sepolia).
    pub chain_id: u64,

    /// Native currency symbol, for display.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Native currency decimals.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

impl NetworkConfig {
    pub fn new(name: impl Into<String>, rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            rpc_url: rpc_url.into(),
            failover_urls: Vec::new(),
            chain_id,
            symbol: default_symbol(),
            decimals: default_decimals(),
        }
    }
}

fn default_symbol() -> String {
    "ETH".to_string()
}

fn default_decimals() -> u8 {
    18
}

fn default_networks() -> Vec<NetworkConfig> {
    vec![
        NetworkConfig::new("Sepolia", "https://eth-sepolia.public.blastapi.io", 11_155_111),
        NetworkConfig::new("Arbitrum Sepolia", "https://sepolia-rollup.arbitrum.io/rpc", 421_614),
        NetworkConfig::new("Optimism Sepolia", "https://sepolia.optimism.io", 11_155_420),
    ]
}

/// RPC client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// RPC request timeout in seconds.
    pub timeout_secs: u64,

    /// Fixed gas budget for a native transfer.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = node estimate, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            gas_limit: 21_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Delay between receipt queries in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound on the wait for a single receipt, in seconds. 0 disables it.
    pub max_wait_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_wait_secs: 600,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ceiling(&self) -> Option<Duration> {
        (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus exporter bind address. Empty disables the exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: String::new(),
        }
    }
}
