//! Per-connection subscription bookkeeping.
//!
//! Tracks which event names the remote peer currently wants pushed to it.
//! Transitions are idempotent: repeat subscribe/unsubscribe requests report
//! "no transition" so the router can absorb duplicates without emitting
//! duplicate notifications.

use std::collections::HashMap;

/// Mapping from event name to subscribed flag.
///
/// Unseen keys default to "not subscribed". Mutated only by the protocol
/// router on inbound subscribe/unsubscribe frames; read by publish
/// operations.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    states: HashMap<String, bool>,
}

impl SubscriptionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an event subscribed.
    ///
    /// Returns true only when a state transition occurred; a repeat
    /// subscribe is a no-op returning false.
    pub fn subscribe(&mut self, event_name: &str) -> bool {
        let state = self.states.entry(event_name.to_string()).or_insert(false);
        if *state {
            return false;
        }
        *state = true;
        true
    }

    /// Mark an event unsubscribed.
    ///
    /// Returns true only when a state transition occurred; unsubscribing an
    /// event that was never subscribed is a no-op returning false.
    pub fn unsubscribe(&mut self, event_name: &str) -> bool {
        match self.states.get_mut(event_name) {
            Some(state) if *state => {
                *state = false;
                true
            }
            _ => false,
        }
    }

    /// Pure lookup; false for unknown keys.
    pub fn is_subscribed(&self, event_name: &str) -> bool {
        self.states.get(event_name).copied().unwrap_or(false)
    }
}
