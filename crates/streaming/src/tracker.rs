use std::collections::BTreeMap;

use crate::request::{RequestKind, RequestSlot, RequestToken};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Newest request for its slot: apply the response.
    Current,
    /// Superseded by a later request for the same slot: drop silently.
    Stale,
}

#[derive(Debug, Clone, Default)]
struct SlotState {
    generation: u64,
    in_flight: bool,
}

/// Tracks in-flight requests per slot.
///
/// Starting a request bumps its slot's generation; only the token carrying the
/// latest generation is accepted on completion, whatever order the responses
/// arrive in. Slots are kept in a `BTreeMap` so iteration is deterministic.
#[derive(Debug, Default)]
pub struct RequestTracker {
    slots: BTreeMap<RequestSlot, SlotState>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, slot: RequestSlot) -> RequestToken {
        let state = self.slots.entry(slot).or_default();
        state.generation = state.generation.wrapping_add(1);
        state.in_flight = true;
        RequestToken {
            slot,
            generation: state.generation,
        }
    }

    pub fn complete(&mut self, token: RequestToken) -> Completion {
        match self.slots.get_mut(&token.slot) {
            Some(state) if state.generation == token.generation => {
                state.in_flight = false;
                Completion::Current
            }
            _ => {
                debug!(slot = ?token.slot, generation = token.generation, "stale response dropped");
                Completion::Stale
            }
        }
    }

    /// Forgets a slot, so that whatever is still in flight for it is stale.
    pub fn invalidate(&mut self, slot: RequestSlot) {
        if let Some(state) = self.slots.get_mut(&slot) {
            state.generation = state.generation.wrapping_add(1);
            state.in_flight = false;
        }
    }

    /// Invalidates every slot of one kind (e.g. all reverse geocodes when the
    /// waypoint list is reset).
    pub fn invalidate_kind(&mut self, kind: RequestKind) {
        let slots: Vec<RequestSlot> = self.slots.keys().filter(|s| s.kind == kind).copied().collect();
        for slot in slots {
            self.invalidate(slot);
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.slots
            .get(&token.slot)
            .is_some_and(|s| s.generation == token.generation)
    }

    pub fn is_loading(&self, kind: RequestKind) -> bool {
        self.slots
            .iter()
            .any(|(slot, state)| slot.kind == kind && state.in_flight)
    }

    pub fn is_slot_loading(&self, slot: RequestSlot) -> bool {
        self.slots.get(&slot).is_some_and(|s| s.in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::{Completion, RequestTracker};
    use crate::request::{RequestKind, RequestSlot};

    #[test]
    fn out_of_order_responses_keep_latest() {
        let mut t = RequestTracker::new();
        let slot = RequestSlot::new(RequestKind::ReverseGeocode, 1);
        let first = t.begin(slot);
        let second = t.begin(slot);

        assert_eq!(t.complete(second), Completion::Current);
        assert_eq!(t.complete(first), Completion::Stale);
        assert!(!t.is_loading(RequestKind::ReverseGeocode));
    }

    #[test]
    fn stale_completion_keeps_loading_flag() {
        let mut t = RequestTracker::new();
        let slot = RequestSlot::single(RequestKind::Route);
        let first = t.begin(slot);
        let _second = t.begin(slot);
        assert_eq!(t.complete(first), Completion::Stale);
        assert!(t.is_loading(RequestKind::Route));
    }

    #[test]
    fn loading_flags_are_per_kind() {
        let mut t = RequestTracker::new();
        let height = t.begin(RequestSlot::single(RequestKind::Height));
        let _locate = t.begin(RequestSlot::single(RequestKind::Locate));
        assert_eq!(t.complete(height), Completion::Current);
        assert!(!t.is_loading(RequestKind::Height));
        assert!(t.is_loading(RequestKind::Locate));
    }

    #[test]
    fn slots_of_one_kind_are_independent() {
        let mut t = RequestTracker::new();
        let a = t.begin(RequestSlot::new(RequestKind::ReverseGeocode, 0));
        let b = t.begin(RequestSlot::new(RequestKind::ReverseGeocode, 1));
        assert_eq!(t.complete(b), Completion::Current);
        assert!(t.is_current(a));
        assert!(t.is_slot_loading(a.slot));
    }

    #[test]
    fn invalidation_makes_in_flight_stale() {
        let mut t = RequestTracker::new();
        let a = t.begin(RequestSlot::new(RequestKind::ReverseGeocode, 0));
        let b = t.begin(RequestSlot::new(RequestKind::ReverseGeocode, 3));
        t.invalidate_kind(RequestKind::ReverseGeocode);
        assert_eq!(t.complete(a), Completion::Stale);
        assert_eq!(t.complete(b), Completion::Stale);
        assert!(!t.is_loading(RequestKind::ReverseGeocode));
    }
}
