//! Expected-clock cut tracking
//!
//! In max-state mode the monitor reports, after every admitted event, the
//! frontier matching its own delivered progress: per process, the event at
//! position `expected[i] - 1` of that process's history, or `Iota` where
//! nothing has been delivered yet.

use hindsight_core::event::Event;
use hindsight_core::event::ProcessMode;
use tracing::info;

use crate::clock::ClockGate;
use crate::frontier::Slot;
use crate::graph::StateGraph;
use crate::session::Session;

#[derive(Debug)]
pub struct FrontierTracker {
    aliases: Vec<String>,
    history: Vec<String>,
}

impl FrontierTracker {
    /// Uses the trace's display aliases when provided (and of the right
    /// length), `P1..PN` otherwise.
    pub fn new(num_processes: usize, process_names: Option<&[String]>) -> Self {
        let aliases = match process_names {
            Some(names) if names.len() == num_processes => names.to_vec(),
            _ => (1..=num_processes).map(|index| format!("P{index}")).collect(),
        };
        Self {
            aliases,
            history: Vec::new(),
        }
    }

    /// Record the frontier matching the monitor's current cut.
    pub fn record(
        &mut self,
        session: &Session,
        gate: &ClockGate,
        graph: &StateGraph,
        trigger: &str,
        event: Option<&Event>,
    ) {
        let header = self.header(gate, trigger, event);
        let target = self.target_cut(session, gate);
        let line = match graph.find_matching(&target) {
            Some(frontier) => {
                let components = frontier
                    .components
                    .iter()
                    .enumerate()
                    .map(|(slot, held)| {
                        let occupant = match held {
                            Slot::Event(id) => session.event(*id).name.clone(),
                            Slot::Mode(_) => "iota".to_string(),
                        };
                        format!("{}:{}", self.aliases[slot], occupant)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let verdict = frontier.value.to_string().to_uppercase();
                format!("{header} -> frontier=[{components}], verdict={verdict}")
            }
            None => format!("{header} -> frontier=[<not_found_for_cut>], verdict=NOT_FOUND"),
        };
        info!(target: "hindsight::tracker", "{line}");
        self.history.push(line);
    }

    fn header(&self, gate: &ClockGate, trigger: &str, event: Option<&Event>) -> String {
        let clock = gate
            .expected()
            .iter()
            .enumerate()
            .map(|(slot, count)| format!("{}:{}", self.aliases[slot], count))
            .collect::<Vec<_>>()
            .join(", ");
        let alias = event
            .and_then(|event| event.participants.first())
            .map(|&slot| format!("@{}", self.aliases[slot]))
            .unwrap_or_default();
        format!("{trigger}{alias}:[{clock}]")
    }

    fn target_cut(&self, session: &Session, gate: &ClockGate) -> Vec<Slot> {
        gate.expected()
            .iter()
            .enumerate()
            .map(|(slot, &count)| {
                if count == 0 {
                    return Slot::Mode(ProcessMode::Iota);
                }
                match session.history(slot).get(count as usize - 1) {
                    Some(&id) => Slot::Event(id),
                    None => Slot::Mode(ProcessMode::Iota),
                }
            })
            .collect()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}
