//! Error types shared across the Hindsight crates

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A trace row that does not have the `[name, processes, propositions,
    /// clock?]` shape. Recoverable: the offending row is skipped.
    #[error("malformed event record: {0}")]
    MalformedEvent(String),

    /// A process label outside `P1..PN`. Recoverable per event.
    #[error("process id '{label}' is outside P1..P{processes}")]
    InvalidProcessId { label: String, processes: usize },

    /// The trace document itself could not be decoded. Fatal to the run.
    #[error("trace format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
