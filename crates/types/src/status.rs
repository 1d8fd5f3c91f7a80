use serde::{Deserialize, Serialize};

/// Lifecycle of a single swap leg, classified from on-chain observation.
///
/// Transitions are monotonic with confirmation depth: a leg only moves
/// forward along Idle → InitiateDetected → Initiated →
/// {RedeemDetected → Redeemed | Expired → RefundDetected → Refunded}.
/// Redeemed and Refunded are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Idle,
    InitiateDetected,
    Initiated,
    RedeemDetected,
    Redeemed,
    RefundDetected,
    Refunded,
    Expired,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapStatus::Redeemed | SwapStatus::Refunded)
    }
}

/// Lifecycle of a whole order, derived from both legs plus the deadline.
///
/// Never persisted; recomputed from leg snapshots on every poll.
/// "CounterParty" variants describe the other party's leg relative to the
/// order creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Matched,
    InitiateDetected,
    Initiated,
    CounterPartyInitiateDetected,
    CounterPartyInitiated,
    RedeemDetected,
    Redeemed,
    CounterPartyRedeemDetected,
    CounterPartyRedeemed,
    RefundDetected,
    Refunded,
    CounterPartyRefundDetected,
    CounterPartyRefunded,
    Expired,
    CounterPartySwapExpired,
    DeadLineExceeded,
}

/// The single next action an executor should take for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Idle,
    Initiate,
    Redeem,
    Refund,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Idle => "idle",
            Action::Initiate => "initiate",
            Action::Redeem => "redeem",
            Action::Refund => "refund",
        };
        f.write_str(s)
    }
}
