//! Error types for graph construction, compilation, and execution
//!
//! Every failure the engine can produce is a variant of [`GraphError`]. Structural
//! problems detected by [`StateGraph::compile`](crate::StateGraph::compile) are
//! grouped under [`CompileError`] and surface as [`GraphError::Compile`].
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── DuplicateNode / ReservedNodeName   - registry misuse
//! ├── UnknownNode                        - lookup of an unregistered node
//! ├── DuplicateEdge                      - second outgoing edge for a node
//! ├── UnmappedLabel                      - dispatcher label missing from its map
//! ├── NoOutgoingEdge                     - node reached with nowhere to go
//! ├── Compile(CompileError)              - validation failures
//! ├── StepExecution                      - a step or dispatcher function failed
//! ├── InvalidInput                       - initial state rejected
//! ├── RecursionLimit / Cancelled         - run control
//! └── UnknownHandler / UnknownCondition  - definition file resolution
//! ```
//!
//! All of them are fatal to the operation that produced them. The engine never
//! retries and never swallows an error.
//!
//! # Examples
//!
//! ```rust
//! use flowgraph_core::error::{CompileError, GraphError};
//!
//! fn describe(err: &GraphError) -> String {
//!     match err {
//!         GraphError::Compile(CompileError::DanglingTarget { from, to }) => {
//!             format!("edge {from} -> {to} points nowhere")
//!         }
//!         GraphError::StepExecution { node, .. } => format!("node {node} failed"),
//!         other => other.to_string(),
//!     }
//! }
//!
//! let err = GraphError::Compile(CompileError::DanglingTarget {
//!     from: "a".to_string(),
//!     to: "b".to_string(),
//! });
//! assert_eq!(describe(&err), "edge a -> b points nowhere");
//! ```

use crate::graph::NodeId;
use thiserror::Error;

/// Boxed error returned by step functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience result type using [`GraphError`]
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building, compiling, or running a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// A node with this name is already registered
    #[error("Node '{0}' is already registered")]
    DuplicateNode(NodeId),

    /// `__start__` and `__end__` cannot be used as node names
    #[error("Node name '{0}' is reserved")]
    ReservedNodeName(NodeId),

    /// Lookup of a node that was never registered
    #[error("Unknown node '{0}'")]
    UnknownNode(NodeId),

    /// The source node already has an outgoing edge
    #[error("Node '{0}' already has an outgoing edge")]
    DuplicateEdge(NodeId),

    /// A dispatcher returned a label that its label map does not contain
    #[error("Dispatcher on node '{node}' returned unmapped label {label}")]
    UnmappedLabel {
        /// Source node of the conditional edge
        node: NodeId,
        /// Debug rendering of the returned label
        label: String,
    },

    /// The node has neither an unconditional nor a conditional edge
    #[error("Node '{0}' has no outgoing edge")]
    NoOutgoingEdge(NodeId),

    /// Structural validation failed
    #[error("Graph compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// A step function or a fallible dispatcher failed
    #[error("Node '{node}' execution failed: {source}")]
    StepExecution {
        /// Node whose step function or outgoing dispatcher failed
        node: NodeId,
        /// Error returned by the failing function
        #[source]
        source: BoxError,
    },

    /// The initial state was rejected by [`GraphState::validate`](crate::state::GraphState::validate)
    #[error("Invalid initial state: {0}")]
    InvalidInput(String),

    /// The run exceeded [`RunConfig::recursion_limit`](crate::config::RunConfig::recursion_limit)
    #[error("Step limit of {limit} reached before node '{node}' could run")]
    RecursionLimit {
        /// Configured limit
        limit: usize,
        /// Node that was due to run next
        node: NodeId,
    },

    /// The run observed its cancellation handle between two nodes
    #[error("Execution cancelled{}", .after.as_ref().map(|n| format!(" after node '{}'", n)).unwrap_or_default())]
    Cancelled {
        /// Last node that completed, if any
        after: Option<NodeId>,
    },

    /// A definition file references a handler that is not registered
    #[error("Unknown handler '{0}'")]
    UnknownHandler(String),

    /// A definition file references a condition that is not registered
    #[error("Unknown condition '{0}'")]
    UnknownCondition(String),

    /// Malformed graph definition
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Failure reading a graph definition
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Wrap a step function error with the name of the failing node
    pub fn step_execution(node: impl Into<NodeId>, source: impl Into<BoxError>) -> Self {
        Self::StepExecution {
            node: node.into(),
            source: source.into(),
        }
    }

    /// Name of the node this error is attributed to, when there is one
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::DuplicateNode(n)
            | Self::ReservedNodeName(n)
            | Self::UnknownNode(n)
            | Self::DuplicateEdge(n)
            | Self::NoOutgoingEdge(n) => Some(n.as_str()),
            Self::UnmappedLabel { node, .. }
            | Self::StepExecution { node, .. }
            | Self::RecursionLimit { node, .. } => Some(node.as_str()),
            Self::Cancelled { after } => after.as_deref(),
            _ => None,
        }
    }
}

/// Structural problems found by the graph compiler
///
/// Validation stops at the first violation. Checks run in a fixed order (entry,
/// edge sources, edge targets, label coverage, terminal markers, dead ends) and
/// visit nodes in lexical order, so the same graph always reports the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// No entry point was set
    #[error("no entry point set")]
    MissingEntry,

    /// The entry point names an unregistered node
    #[error("entry point '{0}' is not a registered node")]
    UnknownEntry(NodeId),

    /// An edge starts at an unregistered node
    #[error("edge source '{0}' is not a registered node")]
    UnknownEdgeSource(NodeId),

    /// An edge target is neither a registered node nor the terminal sentinel
    #[error("edge from '{from}' targets unknown node '{to}'")]
    DanglingTarget {
        /// Edge source
        from: NodeId,
        /// Missing target
        to: NodeId,
    },

    /// A closed label set has a variant with no mapping
    #[error("conditional edge on '{from}' does not map label {label}")]
    UnmappedLabel {
        /// Edge source
        from: NodeId,
        /// Debug rendering of the missing label
        label: String,
    },

    /// A node marked terminal-only is not registered
    #[error("terminal node '{0}' is not a registered node")]
    UnknownTerminal(NodeId),

    /// A registered node has no outgoing edge and is not terminal-only
    #[error("node '{0}' has no outgoing edge and is not marked terminal")]
    DeadEnd(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_execution_keeps_source() {
        let err = GraphError::step_execution("retrieve", "index offline");
        assert_eq!(err.node(), Some("retrieve"));
        assert_eq!(err.to_string(), "Node 'retrieve' execution failed: index offline");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_compile_error_converts() {
        let err: GraphError = CompileError::UnknownEntry("missing".to_string()).into();
        assert!(matches!(err, GraphError::Compile(CompileError::UnknownEntry(ref n)) if n == "missing"));
        assert_eq!(err.node(), None);
    }

    #[test]
    fn test_recursion_limit_names_pending_node() {
        let err = GraphError::RecursionLimit {
            limit: 4,
            node: "retrieve".to_string(),
        };
        assert_eq!(err.node(), Some("retrieve"));
        assert_eq!(err.to_string(), "Step limit of 4 reached before node 'retrieve' could run");
    }

    #[test]
    fn test_cancelled_message() {
        let err = GraphError::Cancelled { after: Some("output".to_string()) };
        assert_eq!(err.to_string(), "Execution cancelled after node 'output'");

        let err = GraphError::Cancelled { after: None };
        assert_eq!(err.to_string(), "Execution cancelled");
    }
}
