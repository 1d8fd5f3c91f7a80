//! Configuration for the gardenswap engine.

pub mod config;
pub mod loader;
pub mod validation;

pub use config::{
    AppConfig, BitcoinConfig, BitcoinNetwork, Environment, EvmChainConfig, NetworkConfig,
    OrderbookConfig,
};
pub use loader::{load_from_file, ConfigError};
pub use validation::validate;
