//! Identifier types and their error handling

pub mod errors;
pub mod identifiers;
