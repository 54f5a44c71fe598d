//! CompiledGraph structure and accessors

use crate::edge::{Edge, EdgeTable};
use crate::error::Result;
use crate::graph::{NodeId, Target};
use crate::node::NodeRegistry;
use crate::state::GraphState;
use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) struct GraphInner<S: GraphState> {
    pub(crate) entry: NodeId,
    pub(crate) nodes: NodeRegistry<S>,
    pub(crate) edges: EdgeTable<S>,
    pub(crate) terminal: BTreeSet<NodeId>,
}

impl<S: GraphState> GraphInner<S> {
    /// Successor of `from`, evaluated on the post-merge state
    ///
    /// A terminal-only node without an edge ends the run; every other node
    /// defers to the edge table.
    pub(crate) fn next(&self, from: &str, state: &S) -> Result<Target> {
        if !self.edges.contains(from) && self.terminal.contains(from) {
            return Ok(Target::End);
        }
        self.edges.resolve(from, state)
    }
}

/// Validated, immutable, executable graph
///
/// Produced by [`StateGraph::compile`](crate::StateGraph::compile). Holds no
/// per-run data, so one instance (or cheap clones of it) can serve any number
/// of concurrent invocations; each invocation owns its own state value.
pub struct CompiledGraph<S: GraphState> {
    pub(crate) inner: Arc<GraphInner<S>>,
}

impl<S: GraphState> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(
        entry: NodeId,
        nodes: NodeRegistry<S>,
        edges: EdgeTable<S>,
        terminal: BTreeSet<NodeId>,
    ) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                entry,
                nodes,
                edges,
                terminal,
            }),
        }
    }

    /// Node execution starts at
    pub fn entry(&self) -> &str {
        &self.inner.entry
    }

    /// Registered node names in lexical order
    pub fn node_names(&self) -> Vec<&str> {
        self.inner.nodes.names().collect()
    }

    /// Outgoing edge of `node`, if it has one
    pub fn edge(&self, node: &str) -> Option<&Edge<S>> {
        self.inner.edges.get(node)
    }

    /// Every target `node` may continue with, sorted and deduplicated
    ///
    /// A terminal-only node without an edge reports [`Target::End`].
    pub fn successors(&self, node: &str) -> Vec<Target> {
        let mut targets: Vec<Target> = match self.inner.edges.get(node) {
            Some(edge) => edge.targets().into_iter().cloned().collect(),
            None if self.inner.terminal.contains(node) => vec![Target::End],
            None => Vec::new(),
        };
        targets.sort();
        targets.dedup();
        targets
    }

    pub fn is_terminal(&self, node: &str) -> bool {
        self.inner.terminal.contains(node)
    }
}

impl<S: GraphState> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.inner.entry)
            .field("nodes", &self.node_names())
            .field("terminal", &self.inner.terminal)
            .finish()
    }
}
