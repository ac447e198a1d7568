//! Event and process-slot model for partial-order traces
//!
//! An event occupies a subset of the system's process slots. Each occupied
//! slot carries a mode that starts out `Iota` and flips to `Closed` once a
//! later event on the same slot supersedes it. Events are owned by the
//! monitoring session's arena and referenced everywhere else by [`EventId`].

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::CoreError;

/// Occupancy state of a process slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessMode {
    /// Raw unassigned marker from trace parsing; converted to `Iota` on
    /// ingestion and never present in constructed frontiers.
    Open,
    /// No event yet on this slot.
    Iota,
    /// The slot's occupant has been superseded.
    Closed,
    /// Transient mid-construction state: the prior occupant is gone and no
    /// replacement arrived. Repaired to `Closed` by edge completion.
    Undefined,
    /// Same-slot conflict poison; invalidates the whole candidate frontier.
    Error,
}

impl ProcessMode {
    pub fn symbol(self) -> char {
        match self {
            ProcessMode::Open => '-',
            ProcessMode::Iota => 'i',
            ProcessMode::Closed => '+',
            ProcessMode::Undefined => '?',
            ProcessMode::Error => '*',
        }
    }
}

impl fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Arena index of an event within a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u32);

impl EventId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One trace occurrence.
///
/// Immutable after construction except for `mode`, whose entries the state
/// graph flips to `Closed` when the event is superseded on a slot.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    /// Ascending slot indices this event occupies.
    pub participants: Vec<usize>,
    pub propositions: FxHashSet<String>,
    pub vector_clock: Vec<u64>,
    /// Per-slot supersession state, `Iota` at creation.
    pub mode: Vec<ProcessMode>,
    /// Monotonic creation stamp issued by the session.
    pub timeline: u64,
}

impl Event {
    pub fn new(
        name: String,
        participants: Vec<usize>,
        propositions: Vec<String>,
        vector_clock: Vec<u64>,
        num_processes: usize,
        timeline: u64,
    ) -> Self {
        Self {
            name,
            participants,
            propositions: propositions.into_iter().collect(),
            vector_clock,
            mode: vec![ProcessMode::Iota; num_processes],
            timeline,
        }
    }

    /// Whether this event occupies the given slot.
    pub fn touches(&self, slot: usize) -> bool {
        self.participants.contains(&slot)
    }

    /// Whether a later event has superseded this one on `slot`.
    pub fn is_closed_at(&self, slot: usize) -> bool {
        self.mode[slot] == ProcessMode::Closed
    }

    pub fn close_slot(&mut self, slot: usize) {
        self.mode[slot] = ProcessMode::Closed;
    }

    /// Mode symbols for the occupied slots, e.g. `e3[i+]`.
    pub fn mode_string(&self) -> String {
        self.participants
            .iter()
            .map(|&slot| self.mode[slot].symbol())
            .collect()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Resolve `P<k>` labels into ascending zero-based slot indices.
///
/// A label that does not parse, or whose index falls outside `1..=N`, is a
/// per-event ingestion error.
pub fn distribute_slots(labels: &[String], num_processes: usize) -> Result<Vec<usize>, CoreError> {
    let mut slots = Vec::with_capacity(labels.len());
    for label in labels {
        let index = label
            .strip_prefix('P')
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| CoreError::InvalidProcessId {
                label: label.clone(),
                processes: num_processes,
            })?;
        if index < 1 || index > num_processes {
            return Err(CoreError::InvalidProcessId {
                label: label.clone(),
                processes: num_processes,
            });
        }
        if !slots.contains(&(index - 1)) {
            slots.push(index - 1);
        }
    }
    slots.sort_unstable();
    Ok(slots)
}
