//! Model-level errors
//!
//! Violations of the data-model invariants: parameter schema drift and
//! workflow-graph structure. These are recoverable at the engine's batch
//! boundary -- a candidate that fails validation is rejected, never scored.

/// Data-model invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A key of the initial parameter set was dropped
    #[error("parameter {name:?} missing from proposed set")]
    ParameterMissing {
        /// The dropped key
        name: String,
    },

    /// A parameter switched between number and bool
    #[error("parameter {name:?} changed type")]
    ParameterTypeChanged {
        /// The offending key
        name: String,
    },

    /// A key outside the initial parameter set was introduced
    #[error("unexpected parameter {name:?}")]
    ParameterAdded {
        /// The introduced key
        name: String,
    },

    /// Node name repeated within a graph
    #[error("duplicate node {name:?}")]
    DuplicateNode {
        /// The repeated name
        name: String,
    },

    /// Edge or entry references a node not in the graph
    #[error("unknown node {name:?}")]
    UnknownNode {
        /// The missing name
        name: String,
    },

    /// Edge from a node to itself
    #[error("self-loop on node {name:?}")]
    SelfLoop {
        /// The node with the loop
        name: String,
    },

    /// Graph contains a directed cycle
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    /// Node not reachable from the entry node
    #[error("node {name:?} unreachable from entry")]
    UnreachableNode {
        /// The unreachable name
        name: String,
    },

    /// Edge count exceeds the configured complexity ceiling
    #[error("graph has {edges} edges, ceiling is {ceiling}")]
    ComplexityCeiling {
        /// Actual edge count
        edges: usize,
        /// Configured ceiling
        ceiling: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::ParameterMissing {
            name: "stop_loss".to_string(),
        };
        assert!(err.to_string().contains("stop_loss"));

        let err = ModelError::ComplexityCeiling { edges: 9, ceiling: 8 };
        assert!(err.to_string().contains("ceiling is 8"));
    }
}
