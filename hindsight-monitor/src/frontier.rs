//! Frontiers: consistent global states of the monitored execution
//!
//! A frontier pins, per process slot, either the last delivered event on that
//! slot or a placeholder mode. Evaluation results are cached on the frontier
//! in a flat `now` vector keyed by `FormulaId`, and each frontier carries a
//! value snapshot of every immediate predecessor's `now` (the `pre` map) so
//! temporal operators never replay history.

use std::fmt;

use hindsight_core::ast::FormulaId;
use hindsight_core::event::{EventId, ProcessMode};
use rustc_hash::{FxHashMap, FxHashSet};

/// Index of a frontier within the state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Synthetic predecessor key carried by the root frontier: an all-false
/// evaluation summary standing in for "before the execution".
pub const ROOT_PRE_KEY: &str = "_";

/// One process-slot entry of a frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Mode(ProcessMode),
    Event(EventId),
}

impl Slot {
    pub fn is_mode(self, mode: ProcessMode) -> bool {
        self == Slot::Mode(mode)
    }

    pub fn as_event(self) -> Option<EventId> {
        match self {
            Slot::Event(id) => Some(id),
            Slot::Mode(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frontier {
    pub name: String,
    /// Numeric part of the name; creation order.
    pub seq: u64,
    pub components: Vec<Slot>,
    /// Union of the propositions of every event in `components`.
    pub propositions: FxHashSet<String>,
    /// Per-subformula evaluation cache, indexed by `FormulaId`.
    pub now: Vec<bool>,
    pre: FxHashMap<String, Vec<bool>>,
    pred_links: Vec<StateId>,
    /// Successor name -> (transition event, successor).
    pub successors: FxHashMap<String, (EventId, StateId)>,
    pub enabled: bool,
    /// Top-level property verdict, set once by evaluation.
    pub value: bool,
    pub evaluated: bool,
}

impl Frontier {
    pub fn new(
        seq: u64,
        name: String,
        components: Vec<Slot>,
        propositions: FxHashSet<String>,
        cache_slots: usize,
    ) -> Self {
        Self {
            name,
            seq,
            components,
            propositions,
            now: vec![false; cache_slots],
            pre: FxHashMap::default(),
            pred_links: Vec::new(),
            successors: FxHashMap::default(),
            enabled: true,
            value: false,
            evaluated: false,
        }
    }

    /// The initial all-`Iota` frontier, with the synthetic `"_"` entry as its
    /// only predecessor summary.
    pub fn root(num_processes: usize, cache_slots: usize) -> Self {
        let mut frontier = Self::new(
            0,
            "S0".to_string(),
            vec![Slot::Mode(ProcessMode::Iota); num_processes],
            FxHashSet::default(),
            cache_slots,
        );
        frontier
            .pre
            .insert(ROOT_PRE_KEY.to_string(), vec![false; cache_slots]);
        frontier
    }

    pub fn is_root(&self) -> bool {
        self.seq == 0
    }

    pub fn holds(&self, proposition: &str) -> bool {
        self.propositions.contains(proposition)
    }

    /// All stored predecessor summaries, the synthetic root entry included.
    pub fn pre(&self) -> &FxHashMap<String, Vec<bool>> {
        &self.pre
    }

    pub fn insert_pre(&mut self, name: String, snapshot: Vec<bool>) {
        self.pre.insert(name, snapshot);
    }

    /// Register a predecessor whose summary is copied in at evaluation time.
    pub fn add_pred_link(&mut self, id: StateId) {
        if !self.pred_links.contains(&id) {
            self.pred_links.push(id);
        }
    }

    pub fn pred_links(&self) -> &[StateId] {
        &self.pred_links
    }

    /// Number of real (non-synthetic) predecessor summaries.
    pub fn predecessor_count(&self) -> usize {
        self.pre.keys().filter(|key| *key != ROOT_PRE_KEY).count()
    }

    /// Cached lookup for a subformula on this frontier.
    pub fn cached(&self, id: FormulaId) -> bool {
        self.now[id.index()]
    }

    /// Split borrows for evaluation: the writable cache, the real
    /// predecessor summaries, and the propositions.
    pub fn eval_parts(&mut self) -> (&mut Vec<bool>, Vec<&Vec<bool>>, &FxHashSet<String>) {
        let Frontier {
            now,
            pre,
            propositions,
            ..
        } = self;
        let predecessors = pre
            .iter()
            .filter(|(key, _)| key.as_str() != ROOT_PRE_KEY)
            .map(|(_, summary)| summary)
            .collect();
        (now, predecessors, propositions)
    }
}

impl fmt::Display for Frontier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: EVALUATED VALUE: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_carries_the_synthetic_summary() {
        let root = Frontier::root(2, 3);
        assert_eq!(root.name, "S0");
        assert!(root.is_root());
        assert_eq!(root.pre().len(), 1);
        assert_eq!(root.pre()[ROOT_PRE_KEY], vec![false; 3]);
        assert_eq!(root.predecessor_count(), 0);
        assert!(root
            .components
            .iter()
            .all(|slot| slot.is_mode(ProcessMode::Iota)));
    }

    #[test]
    fn eval_parts_skips_the_synthetic_summary() {
        let mut frontier = Frontier::root(1, 2);
        frontier.insert_pre("S3".to_string(), vec![true, false]);
        let (_, predecessors, _) = frontier.eval_parts();
        assert_eq!(predecessors.len(), 1);
        assert_eq!(predecessors[0], &vec![true, false]);
    }

    #[test]
    fn pred_links_deduplicate() {
        let mut frontier = Frontier::new(
            1,
            "S1".to_string(),
            vec![Slot::Mode(ProcessMode::Iota)],
            FxHashSet::default(),
            0,
        );
        frontier.add_pred_link(StateId(0));
        frontier.add_pred_link(StateId(0));
        assert_eq!(frontier.pred_links(), &[StateId(0)]);
    }
}
