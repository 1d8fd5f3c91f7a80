//! Core configuration structures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network environment.
    pub network: NetworkConfig,

    /// Orderbook polling.
    pub orderbook: OrderbookConfig,

    /// Bitcoin chain access.
    pub bitcoin: BitcoinConfig,

    /// EVM chain configurations by chain name.
    #[serde(default)]
    pub evm_chains: HashMap<String, EvmChainConfig>,
}

/// Network environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Environment type (mainnet, testnet, local).
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Environment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
    Local,
}

/// Orderbook client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookConfig {
    /// Orderbook endpoint URL.
    pub url: String,

    /// Pending-order polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Bitcoin chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinConfig {
    /// Esplora REST endpoint URL.
    pub esplora_url: String,

    /// Which Bitcoin network the engine settles on.
    #[serde(default = "default_bitcoin_network")]
    pub network: BitcoinNetwork,

    /// Hex-encoded 32-byte digest key deriving per-order secrets.
    pub digest_key: String,
}

/// Bitcoin network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

/// Configuration for one EVM chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmChainConfig {
    /// RPC endpoint URL.
    pub rpc_url: String,

    /// Deployed HTLC contract address.
    pub htlc_address: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000 // 5 seconds
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_bitcoin_network() -> BitcoinNetwork {
    BitcoinNetwork::Regtest
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            log_level: default_log_level(),
        }
    }
}

impl Default for OrderbookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            esplora_url: String::new(),
            network: default_bitcoin_network(),
            digest_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_runtime_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.orderbook.poll_interval_ms, 5000);
        assert_eq!(config.network.log_level, "info");
        assert_eq!(config.bitcoin.network, BitcoinNetwork::Regtest);
        assert!(config.evm_chains.is_empty());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "network": {"environment": "testnet"},
            "orderbook": {"url": "https://orderbook.example"},
            "bitcoin": {"esplora_url": "http://localhost:3000", "digest_key": "aa"}
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.network.environment, Environment::Testnet);
        assert_eq!(config.orderbook.poll_interval_ms, 5000);
        assert_eq!(config.bitcoin.network, BitcoinNetwork::Regtest);
    }

    #[test]
    fn evm_chains_deserialize_by_name() {
        let json = r#"{
            "network": {"environment": "local"},
            "orderbook": {"url": "u"},
            "bitcoin": {"esplora_url": "e", "digest_key": "k"},
            "evm_chains": {
                "arbitrum": {"rpc_url": "https://rpc", "htlc_address": "0xabc"}
            }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.evm_chains["arbitrum"].htlc_address, "0xabc");
        assert_eq!(config.evm_chains["arbitrum"].timeout_ms, 30000);
    }
}
