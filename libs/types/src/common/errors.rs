//! Error types for identifier parsing and validation

use thiserror::Error;

/// Errors that can occur while parsing or validating an identifier
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Input is not valid hexadecimal
    #[error("Invalid hex identifier '{input}'")]
    InvalidHex { input: String },

    /// Decoded byte length does not match the identifier width
    #[error("Identifier must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
