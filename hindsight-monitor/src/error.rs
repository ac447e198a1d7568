//! Monitor error types

use hindsight_core::error::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// A frontier and an event disagree on the system's process count. This
    /// is an internal consistency failure, not bad input: the event's
    /// processing is aborted rather than truncated.
    #[error(
        "frontier '{frontier}' has {frontier_len} process slots but event '{event}' has {event_len}"
    )]
    ComponentMismatch {
        frontier: String,
        frontier_len: usize,
        event: String,
        event_len: usize,
    },

    /// Unknown output level name in the run configuration.
    #[error("invalid output level '{0}' (expected nothing|experiment|default|max-state|debug)")]
    InvalidOutputLevel(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
