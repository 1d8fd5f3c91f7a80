//! Bitcoin Taproot HTLC engine.
//!
//! Builds the three-leaf HTLC script tree (redeem, refund, instant refund),
//! assembles and signs sweep transactions with fee-aware two-pass sizing,
//! and exposes the initiate/redeem/refund/instant-refund settlement surface
//! over pluggable chain-data and Schnorr-signing capabilities.

pub mod error;
pub mod esplora;
pub mod htlc;
pub mod provider;
pub mod script;
pub mod signer;
pub mod tx;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{HtlcError, SignatureFault};
pub use esplora::EsploraProvider;
pub use htlc::{blocks_remaining, BitcoinHtlc, InstantRefundSignature};
pub use provider::{ChainDataProvider, FeeRates, FeeUrgency, TxInfo, TxOutInfo, TxStatus, Utxo};
pub use script::{nums_internal_key, HtlcLeaf, HtlcScript};
pub use signer::{MemorySigner, SchnorrSigner};
pub use tx::{FeeTarget, RawTx, TxBuilder};

/// Result type for bitcoin HTLC operations.
pub type Result<T> = std::result::Result<T, HtlcError>;
