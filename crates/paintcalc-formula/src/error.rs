//! Formula error types
//!
//! These are build-time failures. Problems found while evaluating are
//! spreadsheet error values ([`paintcalc_core::CellError`]) carried inside
//! [`crate::FormulaValue`], never Rust errors.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Malformed formula source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position} (near {token})")]
pub struct ParseError {
    pub message: String,
    /// The offending token as written
    pub token: String,
    /// Byte offset of the token in the formula text
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            token: token.into(),
            position,
        }
    }
}

/// Errors that can occur while parsing formulas or building a graph from them
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Circular reference, as the list of cells around the loop
    #[error("Circular reference: {}", .path.join(" -> "))]
    CircularReference { path: Vec<String> },

    /// Reference to an unknown sheet or name
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}
