//! Vector-clock admission gate
//!
//! Decides, per incoming event, whether it is causally deliverable now or
//! must be held. The rule is deliberately weaker than a full vector-clock
//! comparison: only the clock coordinates of the processes an event actually
//! occupies are checked, each required to be exactly one ahead of the
//! monitor's delivered progress. Coordinates of uninvolved processes are
//! ignored even when they indicate the sender observed more global progress.

use hindsight_core::event::{Event, EventId};
use tracing::debug;

#[derive(Debug)]
pub struct ClockGate {
    expected: Vec<u64>,
    holding: Vec<EventId>,
}

impl ClockGate {
    pub fn new(num_processes: usize) -> Self {
        Self {
            expected: vec![0; num_processes],
            holding: Vec::new(),
        }
    }

    pub fn expected(&self) -> &[u64] {
        &self.expected
    }

    /// Whether the event's causal dependencies on the slots it occupies are
    /// satisfied. An event occupying no slots is vacuously deliverable.
    pub fn is_deliverable(&self, event: &Event) -> bool {
        event.participants.iter().all(|&slot| {
            slot < event.vector_clock.len()
                && slot < self.expected.len()
                && event.vector_clock[slot] == self.expected[slot] + 1
        })
    }

    /// Merge an admitted event's clock into the delivered progress. Only the
    /// involved coordinates move.
    pub fn admit(&mut self, event: &Event) {
        for &slot in &event.participants {
            self.expected[slot] = event.vector_clock[slot];
        }
    }

    pub fn enqueue(&mut self, id: EventId) {
        self.holding.push(id);
    }

    /// One partition pass: remove and return the held events that are now
    /// deliverable, preserving queue order. Admitting a batch can unblock
    /// more, so callers repeat until the pass comes back empty.
    pub fn drain_ready(&mut self, events: &[Event]) -> Vec<EventId> {
        let mut ready = Vec::new();
        let mut remaining = Vec::new();
        for id in self.holding.drain(..) {
            if Self::deliverable_against(&self.expected, &events[id.index()]) {
                ready.push(id);
            } else {
                remaining.push(id);
            }
        }
        self.holding = remaining;
        if !ready.is_empty() {
            debug!(ready = ready.len(), held = self.holding.len(), "queue pass");
        }
        ready
    }

    fn deliverable_against(expected: &[u64], event: &Event) -> bool {
        event.participants.iter().all(|&slot| {
            slot < event.vector_clock.len()
                && slot < expected.len()
                && event.vector_clock[slot] == expected[slot] + 1
        })
    }

    pub fn pending(&self) -> &[EventId] {
        &self.holding
    }

    pub fn has_pending(&self) -> bool {
        !self.holding.is_empty()
    }
}
