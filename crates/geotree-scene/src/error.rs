//! Error types for scene geometry operations.

use std::fmt;

/// Result type for scene geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors raised by merge and outline operations.
///
/// These are scoped to one operation on one detector: the orchestrating
/// pipeline catches them, skips that detector's step, and continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// No geometry-bearing candidates were found under the given node.
    NoGeometriesFound {
        /// Path of the node that was searched.
        path: String,
    },
    /// No material was supplied and none could be taken from the sources.
    NoMaterial {
        /// Path of the node being merged.
        path: String,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::NoGeometriesFound { path } => {
                write!(f, "no geometries found under {path:?}")
            }
            GeometryError::NoMaterial { path } => {
                write!(f, "no material set or found in geometries under {path:?}")
            }
        }
    }
}

impl std::error::Error for GeometryError {}
