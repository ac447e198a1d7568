//! Trace-row ingestion
//!
//! Converts raw JSON rows into arena events. Shape problems and bad process
//! ids are per-event errors: the caller logs and skips the row. A missing or
//! wrong-length vector clock is repaired (zero-filled, padded, or truncated)
//! with a warning.

use hindsight_core::error::CoreError;
use hindsight_core::event::{distribute_slots, EventId};
use hindsight_core::trace::RawEvent;
use serde_json::Value;
use tracing::warn;

use crate::session::Session;

/// Decode one trace row and add it to the session arena.
pub fn ingest_row(session: &mut Session, row: &Value) -> Result<EventId, CoreError> {
    let raw = RawEvent::from_value(row)?;
    ingest_raw(session, raw)
}

pub fn ingest_raw(session: &mut Session, raw: RawEvent) -> Result<EventId, CoreError> {
    let num_processes = session.num_processes();
    let participants = distribute_slots(&raw.processes, num_processes)?;
    let vector_clock = normalize_clock(raw.vector_clock, num_processes, &raw.name);
    Ok(session.add_event(raw.name, participants, raw.propositions, vector_clock))
}

fn normalize_clock(clock: Option<Vec<u64>>, num_processes: usize, event: &str) -> Vec<u64> {
    match clock {
        None => vec![0; num_processes],
        Some(clock) if clock.len() == num_processes => clock,
        Some(mut clock) => {
            warn!(
                event,
                got = clock.len(),
                expected = num_processes,
                "vector clock length mismatch, adjusting"
            );
            clock.resize(num_processes, 0);
            clock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn ingests_a_well_formed_row() {
        let mut session = Session::new(2);
        let id = ingest_row(&mut session, &json!(["e1", ["P2"], ["p", "q"], [0, 1]])).unwrap();
        let event = session.event(id);
        assert_eq!(event.name, "e1");
        assert_eq!(event.participants, vec![1]);
        assert!(event.propositions.contains("p"));
        assert_eq!(event.vector_clock, vec![0, 1]);
    }

    #[test]
    fn missing_clock_defaults_to_zeros() {
        let mut session = Session::new(3);
        let id = ingest_row(&mut session, &json!(["e1", ["P1"], []])).unwrap();
        assert_eq!(session.event(id).vector_clock, vec![0, 0, 0]);
    }

    #[test]
    fn wrong_length_clock_is_padded_or_truncated() {
        let mut session = Session::new(2);
        let id = ingest_row(&mut session, &json!(["short", ["P1"], [], [1]])).unwrap();
        assert_eq!(session.event(id).vector_clock, vec![1, 0]);

        let id = ingest_row(&mut session, &json!(["long", ["P1"], [], [2, 0, 9]])).unwrap();
        assert_eq!(session.event(id).vector_clock, vec![2, 0]);
    }

    #[test]
    fn bad_process_id_is_a_per_event_error() {
        let mut session = Session::new(2);
        assert!(ingest_row(&mut session, &json!(["e", ["P3"], []])).is_err());
        assert!(ingest_row(&mut session, &json!(["e", ["gibberish"], []])).is_err());
        // The arena is untouched by failed rows.
        assert_eq!(session.event_count(), 0);
    }
}
