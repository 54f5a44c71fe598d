//! StateGraph builder and graph compiler
//!
//! [`StateGraph`] collects nodes and edges for a state type `S`, then
//! [`compile`](StateGraph::compile) validates the whole structure and freezes it
//! into a [`CompiledGraph`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  StateGraph<S> (builder)                     │
//! │    NodeRegistry<S>   name -> step function   │
//! │    EdgeTable<S>      name -> Direct | Cond.  │
//! │    entry, terminal-only nodes                │
//! └──────────────────────────────────────────────┘
//!                      │ compile()
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │  CompiledGraph<S> (immutable, shareable)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Registration errors (duplicate node, duplicate edge, reserved name) are
//! returned immediately by the `add_*` methods. Structural errors (dangling
//! targets, missing entry, dead ends) are only detectable once everything has
//! been added, so [`compile`](StateGraph::compile) checks them all.
//!
//! # Quick Start
//!
//! ```rust
//! use flowgraph_core::{GraphState, StateGraph, END};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! impl GraphState for Counter {
//!     type Update = i64;
//!     fn merge(&mut self, update: i64) {
//!         self.value += update;
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = StateGraph::<Counter>::new();
//! graph
//!     .add_node("double", |s: &Counter| Ok(s.value))?
//!     .add_node("bump", |_: &Counter| Ok(1))?
//!     .set_entry_point("double")?
//!     .add_edge("double", "bump")?
//!     .add_edge("bump", END)?;
//!
//! let compiled = graph.compile()?;
//! let result = compiled.invoke(Counter { value: 5 }).await?;
//! assert_eq!(result.value, 11);
//! # Ok(())
//! # }
//! ```

use crate::compiled::CompiledGraph;
use crate::config::{CompileOptions, DeadEndPolicy};
use crate::edge::{ClosedLabel, Edge, EdgeTable, RouteLabel};
use crate::error::{BoxError, CompileError, GraphError, Result};
use crate::graph::{NodeId, Target, END, START};
use crate::node::{AsyncFnNode, FnNode, Node, NodeHandle, NodeRegistry, NodeResult};
use crate::state::GraphState;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

/// Builder for a graph over state type `S`
pub struct StateGraph<S: GraphState> {
    nodes: NodeRegistry<S>,
    edges: EdgeTable<S>,
    entry: Option<NodeId>,
    terminal: BTreeSet<NodeId>,
}

impl<S: GraphState> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            nodes: NodeRegistry::new(),
            edges: EdgeTable::new(),
            entry: None,
            terminal: BTreeSet::new(),
        }
    }

    /// Register a synchronous step function
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateNode`] or [`GraphError::ReservedNodeName`].
    pub fn add_node<F>(&mut self, name: impl Into<NodeId>, step: F) -> Result<&mut Self>
    where
        F: Fn(&S) -> NodeResult<S::Update> + Send + Sync + 'static,
    {
        self.add_node_handle(name, Arc::new(FnNode::new(step)))
    }

    /// Register a step function that returns a future
    pub fn add_async_node<F, Fut>(&mut self, name: impl Into<NodeId>, step: F) -> Result<&mut Self>
    where
        F: Fn(&S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NodeResult<S::Update>> + Send + 'static,
    {
        self.add_node_handle(name, Arc::new(AsyncFnNode::new(step)))
    }

    /// Register a type implementing [`Node`]
    pub fn add_node_impl<N>(&mut self, name: impl Into<NodeId>, node: N) -> Result<&mut Self>
    where
        N: Node<S> + 'static,
    {
        self.add_node_handle(name, Arc::new(node))
    }

    /// Register an already shared step function
    pub fn add_node_handle(&mut self, name: impl Into<NodeId>, node: NodeHandle<S>) -> Result<&mut Self> {
        self.nodes.register(name, node)?;
        Ok(self)
    }

    /// Add an unconditional edge
    ///
    /// `add_edge(START, n)` sets the entry point; `to` may be [`END`].
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<Target>) -> Result<&mut Self> {
        let from = from.into();
        let to = to.into();
        if from == START {
            return match to {
                Target::Node(node) => self.set_entry_point(node),
                Target::End => Err(GraphError::ReservedNodeName(END.to_string())),
            };
        }
        self.edges.add_edge(from, to)?;
        Ok(self)
    }

    /// Add a conditional edge; labels are checked when the dispatcher runs
    ///
    /// ```rust
    /// # use flowgraph_core::{GraphState, StateGraph, Target, END};
    /// # use std::collections::HashMap;
    /// # #[derive(Clone)] struct S { user: String }
    /// # impl GraphState for S { type Update = (); fn merge(&mut self, _: ()) {} }
    /// # let mut graph = StateGraph::<S>::new();
    /// graph.add_conditional_edges(
    ///     "output",
    ///     |s: &S| if s.user == "vip" { "ask" } else { END },
    ///     HashMap::from([("ask", Target::from("ask_for_feedback")), (END, Target::End)]),
    /// )?;
    /// # Ok::<(), flowgraph_core::GraphError>(())
    /// ```
    pub fn add_conditional_edges<L, F>(
        &mut self,
        from: impl Into<NodeId>,
        dispatcher: F,
        label_map: HashMap<L, Target>,
    ) -> Result<&mut Self>
    where
        L: RouteLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
    {
        self.edges.add_conditional_edges(from, dispatcher, label_map)?;
        Ok(self)
    }

    /// Add a conditional edge whose dispatcher can fail
    ///
    /// A dispatcher error stops the run with [`GraphError::StepExecution`]
    /// naming `from`; the update of `from` is already merged at that point.
    pub fn add_fallible_conditional_edges<L, F>(
        &mut self,
        from: impl Into<NodeId>,
        dispatcher: F,
        label_map: HashMap<L, Target>,
    ) -> Result<&mut Self>
    where
        L: RouteLabel,
        F: Fn(&S) -> std::result::Result<L, BoxError> + Send + Sync + 'static,
    {
        self.edges
            .add_fallible_conditional_edges(from, dispatcher, label_map)?;
        Ok(self)
    }

    /// Add a conditional edge over a closed label set
    ///
    /// Compilation fails with [`CompileError::UnmappedLabel`] unless every
    /// variant of `L` has an entry in `label_map`.
    pub fn add_exhaustive_conditional_edges<L, F>(
        &mut self,
        from: impl Into<NodeId>,
        dispatcher: F,
        label_map: HashMap<L, Target>,
    ) -> Result<&mut Self>
    where
        L: ClosedLabel,
        F: Fn(&S) -> L + Send + Sync + 'static,
    {
        self.edges
            .add_exhaustive_conditional_edges(from, dispatcher, label_map)?;
        Ok(self)
    }

    /// Set the node execution starts at
    ///
    /// Setting a different entry twice is a [`GraphError::DuplicateEdge`] on
    /// `__start__`; repeating the same entry is accepted.
    pub fn set_entry_point(&mut self, node: impl Into<NodeId>) -> Result<&mut Self> {
        let node = node.into();
        match &self.entry {
            Some(existing) if *existing != node => Err(GraphError::DuplicateEdge(START.to_string())),
            _ => {
                self.entry = Some(node);
                Ok(self)
            }
        }
    }

    /// Shorthand for `add_edge(node, END)`
    pub fn set_finish_point(&mut self, node: impl Into<NodeId>) -> Result<&mut Self> {
        self.add_edge(node, END)
    }

    /// Designate a node as terminal-only
    ///
    /// A terminal-only node needs no outgoing edge; if it has none, the run ends
    /// after it executes.
    pub fn mark_terminal(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.terminal.insert(node.into());
        self
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn nodes(&self) -> &NodeRegistry<S> {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeTable<S> {
        &self.edges
    }

    /// Validate and freeze the graph with default options
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        self.compile_with(CompileOptions::default())
    }

    /// Validate and freeze the graph
    ///
    /// Runs every structural check and stops at the first violation:
    ///
    /// 1. entry point set and registered
    /// 2. every edge source registered
    /// 3. every edge target registered or [`END`], reachable or not
    /// 4. closed label sets fully mapped
    /// 5. every terminal-only node registered
    /// 6. every other node has an outgoing edge (see [`DeadEndPolicy`])
    #[tracing::instrument(skip_all, fields(nodes = self.nodes.len(), edges = self.edges.len()))]
    pub fn compile_with(self, options: CompileOptions) -> Result<CompiledGraph<S>> {
        let entry = self.validate(options).map_err(|e| {
            tracing::error!(error = %e, "Graph validation failed");
            GraphError::Compile(e)
        })?;
        tracing::debug!(entry = %entry, "Graph compiled");
        Ok(CompiledGraph::new(entry, self.nodes, self.edges, self.terminal))
    }

    fn validate(&self, options: CompileOptions) -> std::result::Result<NodeId, CompileError> {
        let entry = self.entry.clone().ok_or(CompileError::MissingEntry)?;
        if !self.nodes.contains(&entry) {
            return Err(CompileError::UnknownEntry(entry));
        }

        for (from, _) in self.edges.iter() {
            if !self.nodes.contains(from) {
                return Err(CompileError::UnknownEdgeSource(from.to_string()));
            }
        }

        for (from, edge) in self.edges.iter() {
            for target in edge.targets() {
                if let Target::Node(to) = target {
                    if !self.nodes.contains(to) {
                        return Err(CompileError::DanglingTarget {
                            from: from.to_string(),
                            to: to.clone(),
                        });
                    }
                }
            }
        }

        for (from, edge) in self.edges.iter() {
            if let Edge::Conditional(cond) = edge {
                if let Some(label) = cond.unmapped_labels().first() {
                    return Err(CompileError::UnmappedLabel {
                        from: from.to_string(),
                        label: label.clone(),
                    });
                }
            }
        }

        if let Some(unknown) = self.terminal.iter().find(|n| !self.nodes.contains(n)) {
            return Err(CompileError::UnknownTerminal(unknown.clone()));
        }

        for name in self.nodes.names() {
            if self.edges.contains(name) || self.terminal.contains(name) {
                continue;
            }
            match options.dead_end_policy {
                DeadEndPolicy::Error => return Err(CompileError::DeadEnd(name.to_string())),
                DeadEndPolicy::Warn => {
                    tracing::warn!(node = %name, "Node has no outgoing edge and is not marked terminal");
                }
            }
        }

        Ok(entry)
    }
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}
