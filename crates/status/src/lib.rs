//! Pure classification of swap and order lifecycles.
//!
//! Everything in this crate is a function of its arguments: leg snapshots,
//! block heights and the caller-supplied clock. No I/O, no ambient time.
//! The executor recomputes these on every poll instead of persisting them.

pub mod action;
pub mod order;
pub mod swap;

pub use action::action_for;
pub use order::{is_expired, order_status};
pub use swap::swap_status;

/// Margin past the deadline after which an order is dead everywhere.
pub const HARD_DEADLINE_MARGIN_HOURS: u64 = 12;

/// Margin past the deadline after which a still-idle source leg is no
/// longer worth initiating.
pub const INITIATE_DEADLINE_MARGIN_HOURS: u64 = 1;
