//! Lifecycle event bus.
//!
//! Backed by a bounded broadcast channel: emission never blocks the poll
//! loop, and a subscriber that falls behind loses old events instead of
//! applying backpressure.

use gardenswap_types::Action;
use tokio::sync::broadcast;
use tracing::debug;

/// Outcome of one dispatched (order, action) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    Success {
        order_id: String,
        action: Action,
        tx_hash: String,
    },
    /// The action is intentionally not performed by this executor
    /// (user-funded Bitcoin initiation, relay-settled EVM refunds).
    Skipped {
        order_id: String,
        action: Action,
        reason: String,
    },
    Failed {
        order_id: String,
        action: Action,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExecutorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.sender.subscribe()
    }

    /// Fire-and-forget: an event with no subscribers is simply dropped.
    pub fn emit(&self, event: ExecutorEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!(?event, "no event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(order_id: &str) -> ExecutorEvent {
        ExecutorEvent::Success {
            order_id: order_id.to_string(),
            action: Action::Redeem,
            tx_hash: "tx".to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(success("order-1"));
        assert_eq!(rx.recv().await.unwrap(), success("order-1"));
    }

    #[tokio::test]
    async fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.emit(success("order-1"));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.emit(success("order-1"));
        assert_eq!(a.recv().await.unwrap(), success("order-1"));
        assert_eq!(b.recv().await.unwrap(), success("order-1"));
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_old_events() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe();
        bus.emit(success("order-1"));
        bus.emit(success("order-2"));
        // The first event was overwritten; recv reports the lag.
        assert!(rx.recv().await.is_err());
        assert_eq!(rx.recv().await.unwrap(), success("order-2"));
    }
}
