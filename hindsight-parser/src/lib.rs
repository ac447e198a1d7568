//! PCTL property parser
//!
//! Turns property text into a [`hindsight_core::ast::Formula`]. Syntax errors
//! are fatal to a monitoring run, so the API is a single fallible entry point.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use parser::Parser;

/// Parse a property string into a formula tree.
pub fn parse(source: &str) -> Result<hindsight_core::ast::Formula, ParseError> {
    Parser::new(source)?.parse()
}
