//! Trace document model
//!
//! A trace file is a JSON object with the process count and an array of event
//! rows, each row a heterogeneous array `[name, processes, propositions,
//! vector_clock?]`. Rows are kept as raw JSON in the document and converted
//! one at a time during ingestion, so a single malformed row never discards
//! the rest of the trace.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;

/// Parsed trace file.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceDoc {
    /// Number of processes in the traced system.
    pub processes: usize,
    /// Optional display aliases, one per process.
    #[serde(default)]
    pub process_names: Option<Vec<String>>,
    /// Raw event rows, converted via [`RawEvent::from_value`].
    pub events: Vec<Value>,
}

impl TraceDoc {
    pub fn from_str(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, CoreError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// One decoded event row, not yet bound to process slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub name: String,
    pub processes: Vec<String>,
    pub propositions: Vec<String>,
    pub vector_clock: Option<Vec<u64>>,
}

impl RawEvent {
    /// Decode a `[name, [processes], [propositions], [clock]?]` row.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let row = value
            .as_array()
            .ok_or_else(|| CoreError::MalformedEvent(format!("not an array: {value}")))?;
        if row.len() < 3 {
            return Err(CoreError::MalformedEvent(format!(
                "expected at least 3 fields, got {}",
                row.len()
            )));
        }

        let name = row[0]
            .as_str()
            .ok_or_else(|| CoreError::MalformedEvent(format!("event name not a string: {}", row[0])))?
            .to_string();
        let processes = string_array(&row[1], &name, "process list")?;
        let propositions = string_array(&row[2], &name, "proposition list")?;

        let vector_clock = match row.get(3) {
            None => None,
            Some(raw) => Some(clock_array(raw, &name)?),
        };

        Ok(Self {
            name,
            processes,
            propositions,
            vector_clock,
        })
    }
}

fn string_array(value: &Value, event: &str, what: &str) -> Result<Vec<String>, CoreError> {
    let items = value.as_array().ok_or_else(|| {
        CoreError::MalformedEvent(format!("{what} of '{event}' is not an array: {value}"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                CoreError::MalformedEvent(format!("{what} of '{event}' holds non-string: {item}"))
            })
        })
        .collect()
}

fn clock_array(value: &Value, event: &str) -> Result<Vec<u64>, CoreError> {
    let items = value.as_array().ok_or_else(|| {
        CoreError::MalformedEvent(format!("vector clock of '{event}' is not an array: {value}"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_u64().ok_or_else(|| {
                CoreError::MalformedEvent(format!(
                    "vector clock of '{event}' holds a non-natural entry: {item}"
                ))
            })
        })
        .collect()
}
