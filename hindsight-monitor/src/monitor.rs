//! Monitor orchestration
//!
//! Drives one run end to end: ingest each trace row, gate it through the
//! vector-clock admission rule, apply admitted events to the frontier graph,
//! evaluate the property on every new frontier, and drain the holding queue
//! until it stabilizes. Per-event problems are logged and skipped; only
//! setup-phase failures (parsing, I/O) abort a run, and those happen before a
//! `Monitor` exists.

use std::fmt;
use std::time::{Duration, Instant};

use hindsight_core::ast::Formula;
use hindsight_core::event::EventId;
use hindsight_core::trace::TraceDoc;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::clock::ClockGate;
use crate::config::RunConfig;
use crate::eval::Evaluator;
use crate::frontier::Slot;
use crate::graph::StateGraph;
use crate::ingest::ingest_row;
use crate::session::Session;
use crate::tracker::FrontierTracker;

/// Upper bound on queue-drain passes per flush; reaching it is a warning,
/// not a crash, and leaves the remaining events held.
pub const MAX_DRAIN_PASSES: usize = 1000;

/// Lifecycle of a monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Setup,
    Processing,
    Reporting,
    Done,
}

/// Three-valued outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    True,
    False,
    Undetermined,
}

impl Verdict {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Verdict::True
        } else {
            Verdict::False
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::True => "TRUE",
            Verdict::False => "FALSE",
            Verdict::Undetermined => "UNDETERMINED",
        };
        write!(f, "{text}")
    }
}

/// Per-event processing times collected in experiment mode.
#[derive(Debug, Default)]
pub struct RunMetrics {
    samples: Vec<(String, Duration)>,
}

impl RunMetrics {
    pub fn record(&mut self, event: String, elapsed: Duration) {
        self.samples.push((event, elapsed));
    }

    pub fn summary(&self) -> Option<MetricsSummary> {
        let slowest = self.samples.iter().max_by_key(|(_, d)| *d)?.clone();
        let fastest = self.samples.iter().min_by_key(|(_, d)| *d)?.clone();
        let total: Duration = self.samples.iter().map(|(_, d)| *d).sum();
        Some(MetricsSummary {
            slowest,
            fastest,
            mean: total / self.samples.len() as u32,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub slowest: (String, Duration),
    pub fastest: (String, Duration),
    pub mean: Duration,
}

/// Diagnostic snapshot of one frontier for the report.
#[derive(Debug, Clone)]
pub struct FrontierSummary {
    pub name: String,
    pub components: String,
    pub propositions: Vec<String>,
    pub value: bool,
    pub enabled: bool,
    pub transitions: Vec<String>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct MonitorReport {
    pub property: String,
    pub verdict: Verdict,
    pub verdict_frontier: Option<String>,
    pub rows_seen: usize,
    pub events_admitted: usize,
    pub rows_skipped: usize,
    pub frontier_count: usize,
    /// Names of events still held when the trace ended.
    pub pending: Vec<String>,
    pub frontiers: Vec<FrontierSummary>,
    pub tracker_history: Vec<String>,
    pub metrics: Option<MetricsSummary>,
}

pub struct Monitor {
    config: RunConfig,
    session: Session,
    gate: ClockGate,
    graph: StateGraph,
    evaluator: Evaluator,
    tracker: Option<FrontierTracker>,
    rows: Vec<Value>,
    phase: Phase,
    metrics: RunMetrics,
    rows_seen: usize,
    events_admitted: usize,
    rows_skipped: usize,
}

impl Monitor {
    /// Build a monitor from an already-parsed property and trace document,
    /// constructing and evaluating the root frontier.
    pub fn new(formula: &Formula, trace: TraceDoc, config: RunConfig) -> Self {
        let evaluator = Evaluator::from_formula(formula);
        let mut session = Session::new(trace.processes);
        let mut graph = StateGraph::new(&mut session, evaluator.cache_slots());
        let root = graph.root_id();
        let root_value = evaluator.evaluate(graph.frontier_mut(root));
        debug!(value = root_value, "root frontier evaluated");

        let tracker = config
            .is_max_state()
            .then(|| FrontierTracker::new(trace.processes, trace.process_names.as_deref()));

        let mut monitor = Self {
            config,
            session,
            gate: ClockGate::new(trace.processes),
            graph,
            evaluator,
            tracker,
            rows: trace.events,
            phase: Phase::Setup,
            metrics: RunMetrics::default(),
            rows_seen: 0,
            events_admitted: 0,
            rows_skipped: 0,
        };
        if let Some(tracker) = &mut monitor.tracker {
            tracker.record(
                &monitor.session,
                &monitor.gate,
                &monitor.graph,
                "initial",
                None,
            );
        }
        monitor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn gate(&self) -> &ClockGate {
        &self.gate
    }

    /// Process the whole trace and report.
    pub fn run(&mut self) -> MonitorReport {
        let rows = std::mem::take(&mut self.rows);
        for row in &rows {
            self.process_row(row);
        }
        self.finish()
    }

    /// Ingest and dispatch one trace row.
    pub fn process_row(&mut self, row: &Value) {
        self.phase = Phase::Processing;
        self.rows_seen += 1;
        match ingest_row(&mut self.session, row) {
            Err(err) => {
                warn!(%err, "skipping malformed trace row");
                self.rows_skipped += 1;
            }
            Ok(id) => {
                let name = self.session.event(id).name.clone();
                let started = self.config.is_experiment().then(Instant::now);
                self.handle_event(id);
                if let Some(started) = started {
                    self.metrics.record(name, started.elapsed());
                }
            }
        }
    }

    /// Final queue flush and report construction.
    pub fn finish(&mut self) -> MonitorReport {
        self.phase = Phase::Reporting;
        self.flush_holding("end_of_trace");
        if let Some(tracker) = &mut self.tracker {
            tracker.record(&self.session, &self.gate, &self.graph, "end_of_trace", None);
        }
        let report = self.build_report();
        if !report.pending.is_empty() {
            warn!(pending = ?report.pending, "trace ended with events still held");
        }
        self.phase = Phase::Done;
        report
    }

    /// Verdict of the newest enabled frontier; tracks progress mid-run.
    pub fn rolling_verdict(&self) -> Verdict {
        match self.graph.newest_enabled() {
            Some(frontier) => Verdict::from_bool(frontier.value),
            None => Verdict::Undetermined,
        }
    }

    fn handle_event(&mut self, id: EventId) {
        let (name, clock, deliverable) = {
            let event = self.session.event(id);
            (
                event.name.clone(),
                event.vector_clock.clone(),
                self.gate.is_deliverable(event),
            )
        };
        if deliverable {
            debug!(event = %name, clock = ?clock, "event in causal order");
            self.apply_admitted(id);
            self.flush_holding(&name);
        } else {
            debug!(
                event = %name,
                clock = ?clock,
                expected = ?self.gate.expected(),
                "event out of causal order, holding"
            );
            self.gate.enqueue(id);
        }
    }

    /// One graph-and-evaluation round for an admitted event.
    fn apply_admitted(&mut self, id: EventId) {
        let new_ids = match self.graph.process_event(&mut self.session, id) {
            Ok(new_ids) => new_ids,
            Err(err) => {
                error!(%err, "aborting event after construction failure");
                self.rows_skipped += 1;
                return;
            }
        };
        self.events_admitted += 1;
        self.gate.admit(self.session.event(id));
        for state in new_ids {
            self.graph.resolve_predecessors(state);
            let frontier = self.graph.frontier_mut(state);
            let value = self.evaluator.evaluate(frontier);
            debug!(frontier = %self.graph.frontier(state).name, value, "frontier evaluated");
        }
        if self.config.reduce {
            self.graph.reduce();
        }
        if let Some(tracker) = &mut self.tracker {
            let name = self.session.event(id).name.clone();
            tracker.record(
                &self.session,
                &self.gate,
                &self.graph,
                &name,
                Some(self.session.event(id)),
            );
        }
    }

    /// Repeatedly drain the holding queue: admitting one event can make
    /// others deliverable.
    fn flush_holding(&mut self, context: &str) {
        let mut passes = 0;
        loop {
            if passes >= MAX_DRAIN_PASSES {
                warn!(
                    context,
                    passes, "queue drain stopped at the pass bound; trace may be malformed"
                );
                break;
            }
            let batch = self.gate.drain_ready(self.session.events());
            if batch.is_empty() {
                break;
            }
            for id in batch {
                debug!(event = %self.session.event(id).name, "flushing held event");
                self.apply_admitted(id);
            }
            passes += 1;
        }
    }

    fn build_report(&self) -> MonitorReport {
        let verdict_frontier = self.graph.select_verdict_frontier();
        let verdict = verdict_frontier
            .map(|frontier| Verdict::from_bool(frontier.value))
            .unwrap_or(Verdict::Undetermined);
        let verdict_name = verdict_frontier.map(|frontier| frontier.name.clone());

        let frontiers = self
            .graph
            .live()
            .map(|(_, frontier)| {
                let components = frontier
                    .components
                    .iter()
                    .map(|slot| match slot {
                        Slot::Event(id) => self.session.event(*id).name.clone(),
                        Slot::Mode(mode) => mode.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut propositions: Vec<String> =
                    frontier.propositions.iter().cloned().collect();
                propositions.sort();
                let mut transitions: Vec<String> = frontier
                    .successors
                    .iter()
                    .map(|(successor, (event, _))| {
                        format!(
                            "{} -> {} ({})",
                            frontier.name,
                            successor,
                            self.session.event(*event).name
                        )
                    })
                    .collect();
                transitions.sort();
                FrontierSummary {
                    name: frontier.name.clone(),
                    components: format!("({components})"),
                    propositions,
                    value: frontier.value,
                    enabled: frontier.enabled,
                    transitions,
                }
            })
            .collect();

        MonitorReport {
            property: self.evaluator.property().to_string(),
            verdict,
            verdict_frontier: verdict_name,
            rows_seen: self.rows_seen,
            events_admitted: self.events_admitted,
            rows_skipped: self.rows_skipped,
            frontier_count: self.graph.live_count(),
            pending: self
                .gate
                .pending()
                .iter()
                .map(|&id| self.session.event(id).name.clone())
                .collect(),
            frontiers,
            tracker_history: self
                .tracker
                .as_ref()
                .map(|tracker| tracker.history().to_vec())
                .unwrap_or_default(),
            metrics: self.config.is_experiment().then(|| self.metrics.summary()).flatten(),
        }
    }
}
