//! Idempotence ledger for dispatched actions.
//!
//! Keyed by (order id, action). A key is reserved before dispatch and
//! either completed with the settlement hash or released on failure, so
//! the check-then-act sequence is atomic even under overlapping ticks.
//! The cache is owned by the executor and passed by reference — there is
//! no process-wide instance.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use gardenswap_types::Action;

/// Record of one settled action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub action: Action,
    pub tx_hash: String,
    pub timestamp_ms: i64,
    /// Funding outpoint the settlement spent, when known.
    pub utxo: Option<String>,
}

#[derive(Debug)]
enum Slot {
    InFlight,
    Done(CacheEntry),
}

#[derive(Debug, Default)]
pub struct ExecutionCache {
    slots: Mutex<HashMap<(String, Action), Slot>>,
}

impl ExecutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The settlement recorded for (order, action), if any.
    pub fn get(&self, order_id: &str, action: Action) -> Option<CacheEntry> {
        let slots = self.slots.lock().unwrap();
        match slots.get(&(order_id.to_string(), action)) {
            Some(Slot::Done(entry)) => Some(entry.clone()),
            _ => None,
        }
    }

    /// Atomically reserve (order, action) for dispatch.
    ///
    /// Returns false when the action is already settled or currently in
    /// flight; the caller must then skip dispatching.
    pub fn try_acquire(&self, order_id: &str, action: Action) -> bool {
        let mut slots = self.slots.lock().unwrap();
        let key = (order_id.to_string(), action);
        if slots.contains_key(&key) {
            return false;
        }
        slots.insert(key, Slot::InFlight);
        true
    }

    /// Record a settlement for a reserved key. Entries are replaced, never
    /// mutated.
    pub fn complete(
        &self,
        order_id: &str,
        action: Action,
        tx_hash: String,
        utxo: Option<String>,
    ) -> CacheEntry {
        let entry = CacheEntry {
            action,
            tx_hash,
            timestamp_ms: Utc::now().timestamp_millis(),
            utxo,
        };
        self.slots
            .lock()
            .unwrap()
            .insert((order_id.to_string(), action), Slot::Done(entry.clone()));
        entry
    }

    /// Drop an in-flight reservation after a failed dispatch so the next
    /// tick can retry. Settled entries are never released.
    pub fn release(&self, order_id: &str, action: Action) {
        let mut slots = self.slots.lock().unwrap();
        let key = (order_id.to_string(), action);
        if matches!(slots.get(&key), Some(Slot::InFlight)) {
            slots.remove(&key);
        }
    }

    pub fn settled_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .values()
            .filter(|slot| matches!(slot, Slot::Done(_)))
            .count()
    }
}
