//! Owning context for one monitoring run
//!
//! The session holds the event arena, the per-process append-only event
//! histories, and the monotonic counters that name events and frontiers.
//! Keeping these on an owned context (instead of process-wide statics) makes
//! runs independent of each other.

use hindsight_core::event::{Event, EventId};

#[derive(Debug)]
pub struct Session {
    num_processes: usize,
    events: Vec<Event>,
    histories: Vec<Vec<EventId>>,
    next_timeline: u64,
    next_state: u64,
}

impl Session {
    pub fn new(num_processes: usize) -> Self {
        Self {
            num_processes,
            events: Vec::new(),
            histories: vec![Vec::new(); num_processes],
            next_timeline: 0,
            next_state: 0,
        }
    }

    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    /// Create an event in the arena, stamping its timeline position.
    pub fn add_event(
        &mut self,
        name: String,
        participants: Vec<usize>,
        propositions: Vec<String>,
        vector_clock: Vec<u64>,
    ) -> EventId {
        let timeline = self.next_timeline;
        self.next_timeline += 1;
        let id = EventId(self.events.len() as u32);
        self.events.push(Event::new(
            name,
            participants,
            propositions,
            vector_clock,
            self.num_processes,
            timeline,
        ));
        id
    }

    pub fn event(&self, id: EventId) -> &Event {
        &self.events[id.index()]
    }

    pub fn event_mut(&mut self, id: EventId) -> &mut Event {
        &mut self.events[id.index()]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Append the event to the history of every process it occupies.
    pub fn attach_to_histories(&mut self, id: EventId) {
        let participants = self.events[id.index()].participants.clone();
        for slot in participants {
            self.histories[slot].push(id);
        }
    }

    pub fn history(&self, slot: usize) -> &[EventId] {
        &self.histories[slot]
    }

    /// Position of an event within one process's append order.
    pub fn history_position(&self, slot: usize, id: EventId) -> Option<usize> {
        self.histories[slot].iter().position(|&held| held == id)
    }

    /// Hand out the next frontier sequence number and its display name.
    pub fn allocate_state_name(&mut self) -> (u64, String) {
        let seq = self.next_state;
        self.next_state += 1;
        (seq, format!("S{seq}"))
    }
}
