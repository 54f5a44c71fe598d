//! Types produced by running a compiled graph

use crate::error::{GraphError, Result};
use crate::graph::NodeId;
use futures::stream::Stream;
use std::fmt;
use std::pin::Pin;

/// One executed node, as seen by a stream consumer
#[derive(Debug, Clone)]
pub struct StepEvent<S> {
    /// 1-based count of node executions so far
    pub step: usize,
    /// Node that just ran
    pub node: NodeId,
    /// State after merging the node's update
    pub state: S,
}

/// Lazy sequence of [`StepEvent`]s; nothing runs until it is polled
pub type StepStream<S> = Pin<Box<dyn Stream<Item = Result<StepEvent<S>>> + Send>>;

/// A failed run, with the state as it was when the failure happened
///
/// Updates merged before the failure are kept in `state`; the failing node's
/// update (if it had produced one) is not. Callers needing all-or-nothing
/// semantics should keep their own copy of the initial state.
pub struct ExecutionFailure<S> {
    /// What went wrong
    pub error: GraphError,
    /// Partially merged state
    pub state: S,
    /// Node executions that completed before the failure
    pub steps: usize,
}

impl<S> ExecutionFailure<S> {
    /// Drop the partial state and keep the error
    pub fn into_error(self) -> GraphError {
        self.error
    }
}

impl<S> fmt::Debug for ExecutionFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionFailure")
            .field("error", &self.error)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl<S> fmt::Display for ExecutionFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} steps)", self.error, self.steps)
    }
}

impl<S> std::error::Error for ExecutionFailure<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<S> From<ExecutionFailure<S>> for GraphError {
    fn from(failure: ExecutionFailure<S>) -> Self {
        failure.error
    }
}
