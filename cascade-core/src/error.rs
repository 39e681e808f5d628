//! Error types for cascade-core.

use thiserror::Error;

use crate::graph::CellId;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by graph and registry operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The handle does not name a live cell of this graph.
    #[error("unknown cell: {0}")]
    UnknownCell(CellId),

    /// The operation needs a derived cell, but was given a source cell.
    #[error("cell {0} is a source cell, not a derived cell")]
    NotDerived(CellId),

    /// A derived cell was declared without any dependencies.
    #[error("a derived cell needs at least one dependency")]
    EmptyDependencies,

    /// A derived cell was read (or used as an input) before it had a compute function.
    #[error("cell {0} has not been computed yet")]
    Unevaluated(CellId),

    /// Rewiring would close a dependency cycle.
    #[error("cyclic dependency: {cell} cannot depend on {dependency}")]
    Cycle { cell: CellId, dependency: CellId },

    /// The cell still has dependants and cannot be removed.
    #[error("cell {cell} still has {dependants} dependant(s)")]
    InUse { cell: CellId, dependants: usize },

    /// A registry lookup did not find the name.
    #[error("no cell named '{0}'")]
    UnknownName(String),

    /// A compute function failed during recomputation.
    #[error("compute failed for cell {cell}: {source}")]
    Compute {
        cell: CellId,
        #[source]
        source: ComputeError,
    },
}

/// Error returned by a user-supplied compute function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ComputeError {
    message: String,
}

impl ComputeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ComputeError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ComputeError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_error_displays_message() {
        let err = ComputeError::new("division by zero");
        assert_eq!(err.to_string(), "division by zero");
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn compute_failure_keeps_source() {
        use std::error::Error as _;

        let mut graph = crate::graph::Graph::new();
        let cell = graph.source(1);
        let err = GraphError::Compute {
            cell,
            source: "overflow".into(),
        };
        assert!(err.to_string().contains("overflow"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("overflow".to_string()));
    }
}
