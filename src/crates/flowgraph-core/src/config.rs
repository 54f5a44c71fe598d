//! Per-run and per-compile settings
//!
//! [`RunConfig`] controls a single invocation: an optional cap on the number of
//! node executions and an optional [`CancelHandle`] polled between nodes.
//! [`CompileOptions`] controls validation, currently only the policy for nodes
//! that have no outgoing edge.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and a run
///
/// Cloning yields another handle to the same flag. The executor checks it
/// before each node, never in the middle of one.
///
/// ```rust
/// use flowgraph_core::CancelHandle;
///
/// let handle = CancelHandle::new();
/// let observer = handle.clone();
/// handle.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop before its next node
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Settings for one invocation
///
/// The default runs without a step limit and without cancellation, matching
/// plain [`CompiledGraph::invoke`](crate::CompiledGraph::invoke).
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Maximum number of node executions before failing with
    /// [`GraphError::RecursionLimit`](crate::GraphError::RecursionLimit)
    pub recursion_limit: Option<usize>,

    /// Checked between node executions
    pub cancel: Option<CancelHandle>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }
}

/// What the compiler does with a node that has no outgoing edge
///
/// Nodes marked with
/// [`StateGraph::mark_terminal`](crate::StateGraph::mark_terminal) are exempt
/// under both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadEndPolicy {
    /// Fail compilation with [`CompileError::DeadEnd`](crate::CompileError::DeadEnd)
    #[default]
    Error,
    /// Log a warning; reaching the node at run time fails with
    /// [`GraphError::NoOutgoingEdge`](crate::GraphError::NoOutgoingEdge)
    Warn,
}

/// Settings for [`StateGraph::compile_with`](crate::StateGraph::compile_with)
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub dead_end_policy: DeadEndPolicy,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dead_end_policy(mut self, policy: DeadEndPolicy) -> Self {
        self.dead_end_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.recursion_limit, None);
        assert!(!config.is_cancelled());
    }

    #[test]
    fn test_run_config_cancel() {
        let handle = CancelHandle::new();
        let config = RunConfig::new()
            .with_recursion_limit(10)
            .with_cancel_handle(handle.clone());

        assert_eq!(config.recursion_limit, Some(10));
        assert!(!config.is_cancelled());
        handle.cancel();
        assert!(config.is_cancelled());
    }

    #[test]
    fn test_dead_end_policy_serde() {
        let policy: DeadEndPolicy = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(policy, DeadEndPolicy::Warn);
        assert_eq!(DeadEndPolicy::default(), DeadEndPolicy::Error);
    }
}
