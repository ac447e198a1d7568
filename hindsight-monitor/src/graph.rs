//! Frontier-graph construction
//!
//! One call to [`StateGraph::process_event`] applies an admitted event to
//! every enabled frontier and performs the whole bookkeeping round: candidate
//! construction via the slot comparison table, duplicate suppression with
//! predecessor merging, supersession mode flips, disabling of fully-closed
//! frontiers, edge completion between concurrent branches, and the repair of
//! transient `Undefined` slots.

use hindsight_core::event::{EventId, ProcessMode};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::error::MonitorError;
use crate::frontier::{Frontier, Slot, StateId};
use crate::session::Session;

#[derive(Debug)]
pub struct StateGraph {
    /// Arena of frontiers; reduce mode replaces pruned entries with `None`.
    frontiers: Vec<Option<Frontier>>,
    cache_slots: usize,
}

/// Result of comparing one enabled frontier against an incoming event.
struct CompareOutcome {
    components: Vec<Slot>,
    /// Previously held `(event, slot)` pairs superseded by this transition.
    closed_pairs: Vec<(EventId, usize)>,
    /// Source slots that went from `Iota` to occupied; the source frontier's
    /// own entry closes as a side effect of the transition.
    source_closures: Vec<usize>,
}

struct Candidate {
    source: StateId,
    components: Vec<Slot>,
}

impl StateGraph {
    /// Create the graph with its root frontier. Consumes the session's first
    /// state name so that subsequent frontiers number from `S1`.
    pub fn new(session: &mut Session, cache_slots: usize) -> Self {
        let (seq, name) = session.allocate_state_name();
        debug_assert_eq!((seq, name.as_str()), (0, "S0"));
        let root = Frontier::root(session.num_processes(), cache_slots);
        Self {
            frontiers: vec![Some(root)],
            cache_slots,
        }
    }

    pub fn root_id(&self) -> StateId {
        StateId(0)
    }

    pub fn get(&self, id: StateId) -> Option<&Frontier> {
        self.frontiers.get(id.index()).and_then(Option::as_ref)
    }

    pub fn frontier(&self, id: StateId) -> &Frontier {
        self.get(id).expect("frontier pruned or out of range")
    }

    pub fn frontier_mut(&mut self, id: StateId) -> &mut Frontier {
        self.frontiers[id.index()]
            .as_mut()
            .expect("frontier pruned or out of range")
    }

    /// All non-pruned frontiers in creation order.
    pub fn live(&self) -> impl Iterator<Item = (StateId, &Frontier)> {
        self.frontiers
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|f| (StateId(index as u32), f)))
    }

    pub fn live_count(&self) -> usize {
        self.frontiers.iter().filter(|slot| slot.is_some()).count()
    }

    fn live_ids(&self) -> Vec<StateId> {
        self.live().map(|(id, _)| id).collect()
    }

    /// Apply one admitted event: compute every successor frontier, wire
    /// edges, flip supersession modes, and disable exhausted frontiers.
    /// Returns the newly created frontiers in creation order; the caller
    /// evaluates them (in that order) before the next event.
    pub fn process_event(
        &mut self,
        session: &mut Session,
        event_id: EventId,
    ) -> Result<Vec<StateId>, MonitorError> {
        session.attach_to_histories(event_id);

        // Candidate successors from every enabled frontier.
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut closed_pairs: FxHashSet<(EventId, usize)> = FxHashSet::default();
        let mut source_closures: Vec<(StateId, usize)> = Vec::new();
        for id in self.live_ids() {
            let frontier = self.frontier(id);
            if !frontier.enabled {
                continue;
            }
            if let Some(outcome) = compare_components(frontier, session, event_id)? {
                closed_pairs.extend(outcome.closed_pairs);
                source_closures.extend(outcome.source_closures.into_iter().map(|slot| (id, slot)));
                candidates.push(Candidate {
                    source: id,
                    components: outcome.components,
                });
            }
        }

        // Duplicate suppression: one physical frontier per distinct component
        // vector. Every merged-away candidate contributes its source as an
        // additional predecessor of the kept frontier.
        let mut kept: Vec<(Candidate, Vec<StateId>)> = Vec::new();
        for candidate in candidates {
            if let Some((existing, extra_sources)) = kept
                .iter_mut()
                .find(|(existing, _)| existing.components == candidate.components)
            {
                trace!(
                    source = %self.frontier(candidate.source).name,
                    kept_source = %self.frontier(existing.source).name,
                    "merging duplicate successor"
                );
                extra_sources.push(candidate.source);
            } else {
                kept.push((candidate, Vec::new()));
            }
        }

        // Instantiate the kept candidates and wire construction edges.
        let mut new_ids = Vec::new();
        for (candidate, extra_sources) in kept {
            let (seq, name) = session.allocate_state_name();
            let propositions = component_propositions(&candidate.components, session);
            let id = StateId(self.frontiers.len() as u32);
            let mut frontier = Frontier::new(
                seq,
                name.clone(),
                candidate.components,
                propositions,
                self.cache_slots,
            );
            frontier.add_pred_link(candidate.source);
            for &extra in &extra_sources {
                frontier.add_pred_link(extra);
            }
            self.frontiers.push(Some(frontier));
            for source in std::iter::once(candidate.source).chain(extra_sources) {
                self.frontier_mut(source)
                    .successors
                    .insert(name.clone(), (event_id, id));
            }
            new_ids.push(id);
        }

        // Slots the event just occupied close in their source frontiers.
        for (source, slot) in source_closures {
            let frontier = self.frontier_mut(source);
            if frontier.components[slot].is_mode(ProcessMode::Iota) {
                frontier.components[slot] = Slot::Mode(ProcessMode::Closed);
            }
        }

        // Superseded occupants close on the slots they lost.
        for (superseded, slot) in closed_pairs {
            session.event_mut(superseded).close_slot(slot);
        }

        // A frontier with every slot closed can never transition again.
        for id in self.live_ids() {
            let exhausted = {
                let frontier = self.frontier(id);
                frontier.enabled && all_components_closed(frontier, session)
            };
            if exhausted {
                debug!(frontier = %self.frontier(id).name, "disabling exhausted frontier");
                self.frontier_mut(id).enabled = false;
            }
        }

        // Edge completion: concurrent branches one event apart become
        // predecessor/successor pairs even when construction never linked
        // them. Runs before the Undefined sweep so transient slots still rank
        // as "no occupant".
        let all_live = self.live_ids();
        for &b in &new_ids {
            for &a in &all_live {
                if a == b {
                    continue;
                }
                if let Some(via) = immediate_link(self.frontier(a), self.frontier(b), session) {
                    let b_name = self.frontier(b).name.clone();
                    trace!(
                        from = %self.frontier(a).name,
                        to = %b_name,
                        event = %session.event(via).name,
                        "completed edge"
                    );
                    self.frontier_mut(a).successors.insert(b_name, (via, b));
                    self.frontier_mut(b).add_pred_link(a);
                }
            }
        }
        for id in all_live {
            if let Some(frontier) = self.frontiers[id.index()].as_mut() {
                for slot in &mut frontier.components {
                    if slot.is_mode(ProcessMode::Undefined) {
                        *slot = Slot::Mode(ProcessMode::Closed);
                    }
                }
            }
        }

        Ok(new_ids)
    }

    /// Copy each linked predecessor's evaluation summary into the frontier's
    /// `pre` map. Predecessors are always evaluated first, so the snapshots
    /// are final.
    pub fn resolve_predecessors(&mut self, id: StateId) {
        let links = self.frontier(id).pred_links().to_vec();
        let mut snapshots = Vec::with_capacity(links.len());
        for link in links {
            if let Some(pred) = self.get(link) {
                debug_assert!(
                    pred.evaluated,
                    "predecessor {} read before evaluation",
                    pred.name
                );
                snapshots.push((pred.name.clone(), pred.now.clone()));
            }
        }
        let frontier = self.frontier_mut(id);
        for (name, snapshot) in snapshots {
            frontier.insert_pre(name, snapshot);
        }
    }

    /// Drop disabled frontiers from the live collection. Safe because every
    /// surviving frontier holds its predecessors' summaries by value.
    pub fn reduce(&mut self) {
        for entry in self.frontiers.iter_mut() {
            if let Some(frontier) = entry {
                if !frontier.enabled {
                    debug!(frontier = %frontier.name, "pruning disabled frontier");
                    *entry = None;
                }
            }
        }
    }

    fn has_enabled_successor(&self, frontier: &Frontier) -> bool {
        frontier
            .successors
            .values()
            .any(|&(_, id)| self.get(id).is_some_and(|s| s.enabled))
    }

    /// The frontier whose verdict the run reports: an enabled frontier with
    /// no enabled successors (highest-numbered among ties), else the
    /// highest-numbered enabled frontier, else the highest-numbered frontier
    /// still live.
    pub fn select_verdict_frontier(&self) -> Option<&Frontier> {
        self.live()
            .map(|(_, f)| f)
            .filter(|f| f.enabled && !self.has_enabled_successor(f))
            .max_by_key(|f| f.seq)
            .or_else(|| {
                self.live()
                    .map(|(_, f)| f)
                    .filter(|f| f.enabled)
                    .max_by_key(|f| f.seq)
            })
            .or_else(|| self.live().map(|(_, f)| f).max_by_key(|f| f.seq))
    }

    /// Newest enabled frontier, preferring real progress over the root.
    pub fn newest_enabled(&self) -> Option<&Frontier> {
        self.live()
            .map(|(_, f)| f)
            .filter(|f| f.enabled && !f.is_root())
            .max_by_key(|f| f.seq)
            .or_else(|| self.get(self.root_id()))
            .or_else(|| self.live().map(|(_, f)| f).max_by_key(|f| f.seq))
    }

    /// Newest enabled frontier whose components match `target` exactly.
    pub fn find_matching(&self, target: &[Slot]) -> Option<&Frontier> {
        self.live()
            .map(|(_, f)| f)
            .filter(|f| f.enabled && f.components == target)
            .max_by_key(|f| f.seq)
    }
}

/// Slot-by-slot resolution of a frontier against an incoming event.
///
/// Returns `Ok(None)` when any slot resolves to `Error`: the candidate is not
/// a valid frontier and no state name is consumed for it.
fn compare_components(
    frontier: &Frontier,
    session: &Session,
    event_id: EventId,
) -> Result<Option<CompareOutcome>, MonitorError> {
    let event = session.event(event_id);
    if frontier.components.len() != event.mode.len() {
        return Err(MonitorError::ComponentMismatch {
            frontier: frontier.name.clone(),
            frontier_len: frontier.components.len(),
            event: event.name.clone(),
            event_len: event.mode.len(),
        });
    }

    let mut components = Vec::with_capacity(frontier.components.len());
    let mut closed_pairs = Vec::new();
    let mut source_closures = Vec::new();
    for (slot, &held) in frontier.components.iter().enumerate() {
        let incoming = event.touches(slot);
        let resolved = match (held, incoming) {
            (Slot::Mode(ProcessMode::Iota), false) => Slot::Mode(ProcessMode::Iota),
            (Slot::Mode(ProcessMode::Iota), true) => {
                source_closures.push(slot);
                Slot::Event(event_id)
            }
            // An existing occupant is untouched by an event elsewhere, even
            // when already superseded.
            (Slot::Event(previous), false) => Slot::Event(previous),
            // The previous occupant is gone and nothing replaces it yet; the
            // sweep after edge completion repairs this to Closed.
            (Slot::Mode(ProcessMode::Closed), false) => Slot::Mode(ProcessMode::Undefined),
            (Slot::Mode(ProcessMode::Closed), true) => Slot::Mode(ProcessMode::Error),
            (Slot::Event(previous), true) => {
                if previous == event_id || session.event(previous).is_closed_at(slot) {
                    Slot::Mode(ProcessMode::Error)
                } else {
                    closed_pairs.push((previous, slot));
                    Slot::Event(event_id)
                }
            }
            // Open/Undefined/Error never survive into a finalized frontier.
            (Slot::Mode(_), _) => Slot::Mode(ProcessMode::Error),
        };
        if resolved == Slot::Mode(ProcessMode::Error) {
            return Ok(None);
        }
        components.push(resolved);
    }

    Ok(Some(CompareOutcome {
        components,
        closed_pairs,
        source_closures,
    }))
}

fn component_propositions(components: &[Slot], session: &Session) -> FxHashSet<String> {
    let mut propositions = FxHashSet::default();
    for slot in components {
        if let Some(id) = slot.as_event() {
            propositions.extend(session.event(id).propositions.iter().cloned());
        }
    }
    propositions
}

fn all_components_closed(frontier: &Frontier, session: &Session) -> bool {
    if frontier.components.is_empty() {
        return false;
    }
    frontier
        .components
        .iter()
        .enumerate()
        .all(|(slot, &held)| match held {
            Slot::Mode(ProcessMode::Closed) => true,
            Slot::Event(id) => session.event(id).is_closed_at(slot),
            _ => false,
        })
}

/// Decide whether `a` is an immediate predecessor of `b`.
///
/// Differing slots are ranked by their occupants' positions in that process's
/// append-only history (`Iota`/`Undefined` rank as "no occupant"). The pair
/// links only when every differing slot is exactly one position apart and all
/// of them agree on a single replacement event carried by `b`. Everything
/// else (larger distances, literal `Closed` occupants, replacements that are
/// not events) rejects the pair.
fn immediate_link(a: &Frontier, b: &Frontier, session: &Session) -> Option<EventId> {
    let mut replacements: Vec<Slot> = Vec::new();
    for slot in 0..a.components.len() {
        let ours = a.components[slot];
        let theirs = b.components[slot];
        if ours == theirs {
            continue;
        }
        if matches!(ours, Slot::Mode(_)) && matches!(theirs, Slot::Mode(_)) {
            continue;
        }
        let our_rank = history_rank(session, slot, ours)?;
        let their_rank = history_rank(session, slot, theirs)?;
        let distance = (our_rank - their_rank).abs();
        if distance > 1 {
            return None;
        }
        if distance == 1 {
            replacements.push(theirs);
        }
    }
    let first = replacements.first().copied()?;
    if replacements.iter().any(|&replacement| replacement != first) {
        return None;
    }
    first.as_event()
}

fn history_rank(session: &Session, slot: usize, held: Slot) -> Option<i64> {
    match held {
        Slot::Event(id) => session.history_position(slot, id).map(|pos| pos as i64),
        Slot::Mode(ProcessMode::Iota) | Slot::Mode(ProcessMode::Undefined) => Some(-1),
        Slot::Mode(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn harness(num_processes: usize) -> (Session, StateGraph) {
        let mut session = Session::new(num_processes);
        let mut graph = StateGraph::new(&mut session, 0);
        let root = graph.root_id();
        graph.frontier_mut(root).evaluated = true;
        (session, graph)
    }

    fn admit(
        session: &mut Session,
        graph: &mut StateGraph,
        name: &str,
        slots: Vec<usize>,
        props: Vec<&str>,
        clock: Vec<u64>,
    ) -> Vec<StateId> {
        let id = session.add_event(
            name.into(),
            slots,
            props.into_iter().map(String::from).collect(),
            clock,
        );
        let new_ids = graph.process_event(session, id).unwrap();
        for &state in &new_ids {
            graph.resolve_predecessors(state);
            graph.frontier_mut(state).evaluated = true;
        }
        new_ids
    }

    #[test]
    fn first_event_closes_the_root_slot() {
        let (mut session, mut graph) = harness(2);
        let new_ids = admit(&mut session, &mut graph, "a", vec![0], vec!["p"], vec![1, 0]);

        assert_eq!(new_ids.len(), 1);
        let s1 = graph.frontier(new_ids[0]);
        assert_eq!(s1.name, "S1");
        assert!(matches!(s1.components[0], Slot::Event(_)));
        assert!(s1.components[1].is_mode(ProcessMode::Iota));
        assert!(s1.holds("p"));

        let root = graph.frontier(graph.root_id());
        assert!(root.components[0].is_mode(ProcessMode::Closed));
        assert!(root.components[1].is_mode(ProcessMode::Iota));
        assert!(root.enabled);
    }

    #[test]
    fn same_slot_successor_supersedes_the_occupant() {
        let (mut session, mut graph) = harness(1);
        admit(&mut session, &mut graph, "a1", vec![0], vec![], vec![1]);
        let second = admit(&mut session, &mut graph, "a2", vec![0], vec![], vec![2]);

        // a1 is superseded on slot 0 and its frontier exhausts.
        let a1 = session
            .events()
            .iter()
            .find(|event| event.name == "a1")
            .unwrap();
        assert!(a1.is_closed_at(0));
        let s1 = graph.live().find(|(_, f)| f.name == "S1").unwrap().1;
        assert!(!s1.enabled);
        assert!(graph.frontier(second[0]).enabled);
        // The root is fully closed as well.
        assert!(!graph.frontier(graph.root_id()).enabled);
    }

    #[test]
    fn event_on_a_closed_slot_is_discarded() {
        let (mut session, mut graph) = harness(1);
        admit(&mut session, &mut graph, "a1", vec![0], vec![], vec![1]);
        admit(&mut session, &mut graph, "a2", vec![0], vec![], vec![2]);
        let before = graph.live_count();

        // The root slot is a literal Closed; only S2 can take a3.
        let new_ids = admit(&mut session, &mut graph, "a3", vec![0], vec![], vec![3]);
        assert_eq!(new_ids.len(), 1);
        assert_eq!(graph.live_count(), before + 1);
    }

    #[test]
    fn concurrent_events_complete_the_diamond() {
        let (mut session, mut graph) = harness(2);
        admit(&mut session, &mut graph, "a", vec![0], vec!["p"], vec![1, 0]);
        let new_ids = admit(&mut session, &mut graph, "b", vec![1], vec!["q"], vec![0, 1]);

        // S2 = [closed, b] from the root, S3 = [a, b] from S1.
        assert_eq!(new_ids.len(), 2);
        let s3 = graph.frontier(new_ids[1]);
        assert_eq!(s3.name, "S3");
        assert_eq!(s3.predecessor_count(), 2);
        assert!(s3.pre().contains_key("S1"));
        assert!(s3.pre().contains_key("S2"));

        // S2's Undefined slot was swept to Closed after completion.
        let s2 = graph.frontier(new_ids[0]);
        assert!(s2.components[0].is_mode(ProcessMode::Closed));
        let (via, _) = s2.successors["S3"];
        assert_eq!(session.event(via).name, "a");
    }

    #[test]
    fn duplicate_successors_merge_into_one_frontier() {
        let (mut session, mut graph) = harness(2);
        let x = session.add_event("x".into(), vec![0], vec![], vec![1, 0]);
        let y = session.add_event("y".into(), vec![1], vec![], vec![0, 1]);
        session.attach_to_histories(x);
        session.attach_to_histories(y);

        // Hand-built divergent branches that one handshake maps to the same
        // component vector.
        let root = graph.root_id();
        graph.frontier_mut(root).enabled = false;
        let (_, name) = session.allocate_state_name();
        let mut branch_a = Frontier::new(
            1,
            name,
            vec![Slot::Event(x), Slot::Mode(ProcessMode::Iota)],
            Default::default(),
            0,
        );
        branch_a.evaluated = true;
        let (_, name) = session.allocate_state_name();
        let mut branch_b = Frontier::new(
            2,
            name,
            vec![Slot::Event(x), Slot::Event(y)],
            Default::default(),
            0,
        );
        branch_b.evaluated = true;
        graph.frontiers.push(Some(branch_a));
        graph.frontiers.push(Some(branch_b));

        let sync = session.add_event("sync".into(), vec![0, 1], vec![], vec![2, 2]);
        let new_ids = graph.process_event(&mut session, sync).unwrap();

        // One physical frontier, predecessor-linked to both sources, with a
        // successor edge registered on each.
        assert_eq!(new_ids.len(), 1);
        let merged = graph.frontier(new_ids[0]);
        assert_eq!(merged.pred_links().len(), 2);
        let merged_name = merged.name.clone();
        assert!(graph.frontier(StateId(1)).successors.contains_key(&merged_name));
        assert!(graph.frontier(StateId(2)).successors.contains_key(&merged_name));

        // No two enabled frontiers share a component vector.
        let enabled: Vec<_> = graph
            .live()
            .filter(|(_, f)| f.enabled)
            .map(|(_, f)| f.components.clone())
            .collect();
        for (index, components) in enabled.iter().enumerate() {
            assert!(!enabled[index + 1..].contains(components));
        }
    }

    #[test]
    fn completion_rejects_non_immediate_branches() {
        let (mut session, _) = harness(2);
        let a1 = session.add_event("a1".into(), vec![0], vec![], vec![1, 0]);
        let a2 = session.add_event("a2".into(), vec![0], vec![], vec![2, 0]);
        let a3 = session.add_event("a3".into(), vec![0], vec![], vec![3, 0]);
        let b = session.add_event("b".into(), vec![1], vec![], vec![0, 1]);
        for id in [a1, a2, a3, b] {
            session.attach_to_histories(id);
        }

        let cache = 0;
        let older = Frontier::new(
            1,
            "SA".into(),
            vec![Slot::Event(a1), Slot::Event(b)],
            Default::default(),
            cache,
        );
        let skipped = Frontier::new(
            2,
            "SB".into(),
            vec![Slot::Event(a3), Slot::Event(b)],
            Default::default(),
            cache,
        );
        // Two steps apart on P1: not an immediate edge.
        assert_eq!(immediate_link(&older, &skipped, &session), None);

        let adjacent = Frontier::new(
            3,
            "SC".into(),
            vec![Slot::Event(a2), Slot::Event(b)],
            Default::default(),
            cache,
        );
        // One position apart on P1 only: links via a2.
        assert_eq!(immediate_link(&older, &adjacent, &session), Some(a2));

        let undefined_half = Frontier::new(
            4,
            "SD".into(),
            vec![Slot::Event(a1), Slot::Mode(ProcessMode::Undefined)],
            Default::default(),
            cache,
        );
        // The Undefined slot ranks as "no occupant", one step below b.
        assert_eq!(immediate_link(&undefined_half, &older, &session), Some(b));
    }

    #[test]
    fn completion_rejects_disagreeing_replacements() {
        let (mut session, _) = harness(2);
        let a = session.add_event("a".into(), vec![0], vec![], vec![1, 0]);
        let b = session.add_event("b".into(), vec![1], vec![], vec![0, 1]);
        session.attach_to_histories(a);
        session.attach_to_histories(b);

        let lhs = Frontier::new(
            1,
            "SA".into(),
            vec![Slot::Mode(ProcessMode::Iota), Slot::Mode(ProcessMode::Iota)],
            Default::default(),
            0,
        );
        let rhs = Frontier::new(
            2,
            "SB".into(),
            vec![Slot::Event(a), Slot::Event(b)],
            Default::default(),
            0,
        );
        // Both slots are one step apart but disagree on the replacement.
        assert_eq!(immediate_link(&lhs, &rhs, &session), None);
    }

    #[test]
    fn mismatched_component_length_is_a_hard_error() {
        let (mut session, mut graph) = harness(2);
        let mut foreign = Session::new(3);
        let id = foreign.add_event("x".into(), vec![0], vec![], vec![1, 0, 0]);
        // Rebuild the event in our session with the wrong width.
        let bad = session.add_event(
            foreign.event(id).name.clone(),
            vec![0],
            vec![],
            vec![1, 0, 0],
        );
        // Force a mismatched mode vector by hand.
        session.event_mut(bad).mode.push(ProcessMode::Iota);
        assert!(matches!(
            graph.process_event(&mut session, bad),
            Err(MonitorError::ComponentMismatch { .. })
        ));
    }

    #[test]
    fn reduce_prunes_disabled_frontiers_only() {
        let (mut session, mut graph) = harness(1);
        admit(&mut session, &mut graph, "a1", vec![0], vec![], vec![1]);
        admit(&mut session, &mut graph, "a2", vec![0], vec![], vec![2]);
        let before = graph.live_count();
        graph.reduce();
        assert!(graph.live_count() < before);
        assert!(graph.live().all(|(_, f)| f.enabled));
    }

    #[test]
    fn closure_invariant_holds_after_each_round() {
        let (mut session, mut graph) = harness(2);
        admit(&mut session, &mut graph, "a", vec![0], vec![], vec![1, 0]);
        admit(&mut session, &mut graph, "b", vec![1], vec![], vec![0, 1]);
        admit(&mut session, &mut graph, "c", vec![0], vec![], vec![2, 0]);

        for (_, frontier) in graph.live() {
            let exhausted = all_components_closed(frontier, &session);
            assert_eq!(
                !frontier.enabled,
                exhausted,
                "frontier {} violates the closure invariant",
                frontier.name
            );
        }
    }
}
