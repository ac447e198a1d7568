//! Parser error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("illegal character '{character}' at position {position}")]
    IllegalCharacter { character: char, position: usize },

    #[error("maximum formula nesting depth exceeded: {depth} exceeds limit of {max_depth}")]
    MaxDepthExceeded { depth: usize, max_depth: usize },
}
