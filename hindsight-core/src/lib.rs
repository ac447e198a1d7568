//! Hindsight core: PCTL formula model and trace-event model
//!
//! This crate owns the data the other Hindsight crates exchange: the formula
//! tree with its canonical cache keys, the event/process-mode model of
//! partial-order traces, and the trace document format.

pub mod ast;
pub mod error;
pub mod event;
pub mod trace;

pub use ast::{compile, CompiledFormula, CompiledOp, CompiledSpec, Formula, FormulaId, FormulaRegistry};
pub use error::CoreError;
pub use event::{distribute_slots, Event, EventId, ProcessMode};
pub use trace::{RawEvent, TraceDoc};
