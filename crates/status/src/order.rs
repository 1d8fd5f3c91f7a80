use gardenswap_types::{MatchedOrder, OrderStatus, SwapStatus};
use tracing::trace;

use crate::swap::swap_status;
use crate::{HARD_DEADLINE_MARGIN_HOURS, INITIATE_DEADLINE_MARGIN_HOURS};

/// Whether `now_ms` is past `deadline` (unix seconds) plus a margin.
pub fn is_expired(deadline: u64, margin_hours: u64, now_ms: u64) -> bool {
    now_ms >= deadline * 1000 + margin_hours * 3_600_000
}

/// Derive the order status from both legs plus the deadline.
///
/// Precedence, highest first:
/// 1. destination redeem — our claim on the counterparty's leg settles the
///    order regardless of anything else;
/// 2. source redeem — the counterparty claimed our leg; ranked above the
///    refund/expiry branches so a source leg that redeemed and was later
///    re-initiated (RBF replacement) still reports redeemed;
/// 3. source refund, destination expiry, source expiry, destination refund;
/// 4. hard deadline, counterparty initiation, own initiation (idle legs stop
///    being worth initiating once the pre-deadline margin passes);
/// 5. Matched.
pub fn order_status(
    order: &MatchedOrder,
    source_block: u64,
    destination_block: u64,
    now_ms: u64,
) -> OrderStatus {
    let source = swap_status(&order.source_swap, source_block);
    let destination = swap_status(&order.destination_swap, destination_block);
    trace!(
        order_id = %order.order_id,
        source = ?source,
        destination = ?destination,
        "classified legs"
    );

    match destination {
        SwapStatus::Redeemed => return OrderStatus::Redeemed,
        SwapStatus::RedeemDetected => return OrderStatus::RedeemDetected,
        _ => {}
    }

    match source {
        SwapStatus::Redeemed => return OrderStatus::CounterPartyRedeemed,
        SwapStatus::RedeemDetected => return OrderStatus::CounterPartyRedeemDetected,
        SwapStatus::Refunded => return OrderStatus::Refunded,
        SwapStatus::RefundDetected => return OrderStatus::RefundDetected,
        _ => {}
    }

    if destination == SwapStatus::Expired {
        return OrderStatus::CounterPartySwapExpired;
    }
    if source == SwapStatus::Expired {
        return OrderStatus::Expired;
    }

    match destination {
        SwapStatus::Refunded => return OrderStatus::CounterPartyRefunded,
        SwapStatus::RefundDetected => return OrderStatus::CounterPartyRefundDetected,
        _ => {}
    }

    if is_expired(order.deadline, HARD_DEADLINE_MARGIN_HOURS, now_ms) {
        return OrderStatus::DeadLineExceeded;
    }

    match destination {
        SwapStatus::Initiated => return OrderStatus::CounterPartyInitiated,
        SwapStatus::InitiateDetected => return OrderStatus::CounterPartyInitiateDetected,
        _ => {}
    }

    match source {
        SwapStatus::Initiated => OrderStatus::Initiated,
        SwapStatus::InitiateDetected => OrderStatus::InitiateDetected,
        _ => {
            if is_expired(order.deadline, INITIATE_DEADLINE_MARGIN_HOURS, now_ms) {
                OrderStatus::DeadLineExceeded
            } else {
                OrderStatus::Matched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenswap_types::{Chain, SwapLeg};

    const DEADLINE: u64 = 1_700_000_000;
    // Well before the deadline.
    const NOW_MS: u64 = (DEADLINE - 3_600) * 1000;

    fn leg(chain: Chain) -> SwapLeg {
        SwapLeg {
            chain,
            asset: "primary".to_string(),
            initiator: "a".repeat(64),
            redeemer: "b".repeat(64),
            amount: 50_000,
            timelock: 10,
            secret_hash: "c".repeat(64),
            initiate_tx_hash: None,
            initiate_block_number: None,
            redeem_tx_hash: None,
            redeem_block_number: None,
            refund_tx_hash: None,
            refund_block_number: None,
        }
    }

    fn order() -> MatchedOrder {
        MatchedOrder {
            order_id: "order-1".to_string(),
            nonce: 1,
            created_at: DEADLINE - 7_200,
            source_swap: leg(Chain::Bitcoin),
            destination_swap: leg(Chain::Ethereum),
            deadline: DEADLINE,
        }
    }

    fn initiated(l: &mut SwapLeg, height: u64) {
        l.initiate_tx_hash = Some("init".to_string());
        l.initiate_block_number = Some(height);
    }

    fn redeemed(l: &mut SwapLeg, height: u64) {
        l.redeem_tx_hash = Some("redeem".to_string());
        l.redeem_block_number = Some(height);
    }

    #[test]
    fn fresh_order_is_matched() {
        assert_eq!(order_status(&order(), 100, 100, NOW_MS), OrderStatus::Matched);
    }

    #[test]
    fn destination_redeem_wins_over_everything() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        initiated(&mut o.destination_swap, 100);
        redeemed(&mut o.destination_swap, 105);
        // Source also expired; destination redeem still wins.
        assert_eq!(order_status(&o, 10_000, 104, NOW_MS), OrderStatus::Redeemed);
    }

    #[test]
    fn destination_redeem_detected_without_confirmation() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        initiated(&mut o.destination_swap, 100);
        o.destination_swap.redeem_tx_hash = Some("redeem".to_string());
        assert_eq!(
            order_status(&o, 105, 105, NOW_MS),
            OrderStatus::RedeemDetected
        );
    }

    #[test]
    fn source_redeem_outranks_destination_expiry() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        redeemed(&mut o.source_swap, 104);
        initiated(&mut o.destination_swap, 100);
        // Destination well past its timelock: expired.
        assert_eq!(
            order_status(&o, 105, 10_000, NOW_MS),
            OrderStatus::CounterPartyRedeemed
        );
    }

    #[test]
    fn source_refund_outranks_destination_refund() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        o.source_swap.refund_tx_hash = Some("refund".to_string());
        o.source_swap.refund_block_number = Some(120);
        initiated(&mut o.destination_swap, 100);
        o.destination_swap.refund_tx_hash = Some("refund".to_string());
        assert_eq!(order_status(&o, 150, 150, NOW_MS), OrderStatus::Refunded);
    }

    #[test]
    fn destination_expiry_reported_as_counterparty() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        initiated(&mut o.destination_swap, 100);
        assert_eq!(
            order_status(&o, 105, 111, NOW_MS),
            OrderStatus::CounterPartySwapExpired
        );
    }

    #[test]
    fn source_expiry_requests_refund_path() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        assert_eq!(order_status(&o, 111, 100, NOW_MS), OrderStatus::Expired);
    }

    #[test]
    fn counterparty_initiation_states() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        o.destination_swap.initiate_tx_hash = Some("init".to_string());
        assert_eq!(
            order_status(&o, 105, 105, NOW_MS),
            OrderStatus::CounterPartyInitiateDetected
        );
        o.destination_swap.initiate_block_number = Some(105);
        assert_eq!(
            order_status(&o, 105, 106, NOW_MS),
            OrderStatus::CounterPartyInitiated
        );
    }

    #[test]
    fn own_initiation_states() {
        let mut o = order();
        o.source_swap.initiate_tx_hash = Some("init".to_string());
        assert_eq!(
            order_status(&o, 100, 100, NOW_MS),
            OrderStatus::InitiateDetected
        );
        o.source_swap.initiate_block_number = Some(100);
        assert_eq!(order_status(&o, 101, 100, NOW_MS), OrderStatus::Initiated);
    }

    #[test]
    fn idle_source_past_initiate_margin_is_deadline_exceeded() {
        let o = order();
        let past_margin = DEADLINE * 1000 + 3_600_000;
        assert_eq!(
            order_status(&o, 100, 100, past_margin),
            OrderStatus::DeadLineExceeded
        );
    }

    #[test]
    fn initiated_order_past_hard_margin_is_deadline_exceeded() {
        let mut o = order();
        initiated(&mut o.source_swap, 100);
        let past_hard = DEADLINE * 1000 + HARD_DEADLINE_MARGIN_HOURS * 3_600_000;
        assert_eq!(
            order_status(&o, 101, 100, past_hard),
            OrderStatus::DeadLineExceeded
        );
    }

    #[test]
    fn is_expired_boundary() {
        let deadline = 1_000;
        assert!(!is_expired(deadline, 1, 1_000 * 1000 + 3_599_999));
        assert!(is_expired(deadline, 1, 1_000 * 1000 + 3_600_000));
    }
}
