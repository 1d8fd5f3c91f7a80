use gardenswap_types::{Action, OrderStatus};

/// The single next action for an order status.
///
/// Only three statuses demand work from the executor: a fresh match needs
/// its source leg funded, a counterparty initiation (detected or confirmed)
/// unlocks our destination redeem, and a source expiry unlocks refund.
/// A detected-but-unconfirmed redeem is already in flight, so it maps to
/// Idle rather than a second broadcast.
pub fn action_for(status: OrderStatus) -> Action {
    match status {
        OrderStatus::Matched => Action::Initiate,
        OrderStatus::CounterPartyInitiated | OrderStatus::CounterPartyInitiateDetected => {
            Action::Redeem
        }
        OrderStatus::Expired => Action::Refund,
        _ => Action::Idle,
    }
}
