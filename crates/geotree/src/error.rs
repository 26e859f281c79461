//! Error types for the geotree crate.

use std::fmt;

/// Result type for geotree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in geotree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A lookup that requires a unique node found more than one.
    MultipleMatches {
        /// The pattern that was searched for.
        pattern: String,
        /// How many nodes matched.
        count: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MultipleMatches { pattern, count } => {
                write!(f, "pattern {pattern:?} matched {count} nodes, expected at most one")
            }
        }
    }
}

impl std::error::Error for Error {}
