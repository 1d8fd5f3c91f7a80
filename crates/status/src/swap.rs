use gardenswap_types::{SwapLeg, SwapStatus};

/// Classify one leg from its observed fields and the chain's current height.
///
/// Precedence is fixed: redeem > refund > expiry > initiate > idle. A leg
/// that redeemed after its own timelock expired is still Redeemed. Crossing
/// from a "Detected" state to a firm state requires both the tx hash and a
/// confirmed block number.
pub fn swap_status(leg: &SwapLeg, current_block: u64) -> SwapStatus {
    if leg.redeem_tx_hash.is_some() {
        return if leg.redeem_block_number.is_some() {
            SwapStatus::Redeemed
        } else {
            SwapStatus::RedeemDetected
        };
    }

    if leg.refund_tx_hash.is_some() {
        return if leg.refund_block_number.is_some() {
            SwapStatus::Refunded
        } else {
            SwapStatus::RefundDetected
        };
    }

    if let Some(initiated_at) = leg.initiate_block_number {
        if current_block > initiated_at + leg.timelock {
            return SwapStatus::Expired;
        }
    }

    if leg.initiate_tx_hash.is_some() {
        return if leg.initiate_block_number.is_some() {
            SwapStatus::Initiated
        } else {
            SwapStatus::InitiateDetected
        };
    }

    SwapStatus::Idle
}
