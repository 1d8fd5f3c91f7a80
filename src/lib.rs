//! gardenswap — cross-chain atomic swap engine.
//!
//! Facade over the workspace crates: the shared data model, the pure
//! status/action parsers, the Bitcoin Taproot HTLC engine, the execution
//! orchestrator and configuration.

pub use gardenswap_bitcoin::{
    nums_internal_key, BitcoinHtlc, ChainDataProvider, EsploraProvider, FeeRates, FeeUrgency,
    HtlcError, HtlcLeaf, HtlcScript, InstantRefundSignature, MemorySigner, SchnorrSigner, TxBuilder,
    Utxo,
};
pub use gardenswap_config::{AppConfig, ConfigError};
pub use gardenswap_executor::{
    BlockNumberFetcher, ChainHtlc, DispatchError, EventBus, ExecutionCache, Executor,
    ExecutorBuilder, ExecutorConfig, ExecutorEvent, OrderFilter, OrderbookClient, OrderbookError,
    StopHandle,
};
pub use gardenswap_status::{action_for, is_expired, order_status, swap_status};
pub use gardenswap_types::{
    Action, Chain, ChainFamily, DerivedSecret, MatchedOrder, OrderStatus, SecretManager, SwapLeg,
    SwapStatus,
};
