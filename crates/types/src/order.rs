use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Chain;

/// One leg of a matched swap, as observed from the orderbook.
///
/// A leg is an immutable snapshot: observation fields (`*_tx_hash`,
/// `*_block_number`) are only ever updated by re-fetching the order, never
/// mutated in place. For Bitcoin legs `initiator` and `redeemer` carry
/// 64-char hex x-only public keys; for other families they are opaque
/// chain addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapLeg {
    pub chain: Chain,

    /// Asset identifier on `chain` (e.g. "primary" for native BTC, a token
    /// contract address for EVM chains).
    pub asset: String,

    /// Party that funds this leg.
    pub initiator: String,

    /// Party that can claim this leg with the secret.
    pub redeemer: String,

    /// Amount in the chain's smallest unit (sats for Bitcoin).
    pub amount: u64,

    /// Relative timelock in blocks after which the initiator may refund.
    pub timelock: u64,

    /// Hex SHA-256 of the swap secret; identical across both legs.
    pub secret_hash: String,

    #[serde(default)]
    pub initiate_tx_hash: Option<String>,
    #[serde(default)]
    pub initiate_block_number: Option<u64>,
    #[serde(default)]
    pub redeem_tx_hash: Option<String>,
    #[serde(default)]
    pub redeem_block_number: Option<u64>,
    #[serde(default)]
    pub refund_tx_hash: Option<String>,
    #[serde(default)]
    pub refund_block_number: Option<u64>,
}

/// A matched order: two legs bound by one secret hash.
///
/// The source leg is funded by the order's creator; the destination leg by
/// the counterparty. `nonce` is unique per initiator and deterministically
/// derives the swap secret (see [`crate::SecretManager`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedOrder {
    pub order_id: String,
    pub nonce: u64,

    /// Unix seconds at which the order was matched.
    pub created_at: u64,

    pub source_swap: SwapLeg,
    pub destination_swap: SwapLeg,

    /// Unix seconds by which both legs must be initiated.
    pub deadline: u64,
}

impl MatchedOrder {
    /// Check the cross-leg invariants.
    ///
    /// Both legs must commit to the same non-empty secret hash; an order
    /// violating this can never settle atomically and must not be executed.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.source_swap.secret_hash.is_empty() {
            return Err(OrderValidationError::MissingSecretHash {
                order_id: self.order_id.clone(),
            });
        }
        if !self
            .source_swap
            .secret_hash
            .eq_ignore_ascii_case(&self.destination_swap.secret_hash)
        {
            return Err(OrderValidationError::SecretHashMismatch {
                order_id: self.order_id.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum OrderValidationError {
    #[error("order {order_id} has no secret hash")]
    MissingSecretHash { order_id: String },

    #[error("order {order_id}: source and destination secret hashes differ")]
    SecretHashMismatch { order_id: String },
}
