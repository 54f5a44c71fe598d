//! Step functions and the node registry
//!
//! A node is a named step function with the contract
//! `(&State) -> Result<State::Update>`. The trait [`Node`] is what the executor
//! calls; plain closures are adapted through [`FnNode`] (synchronous) and
//! [`AsyncFnNode`] (returns a future).
//!
//! # Implementing a node
//!
//! ```rust
//! use async_trait::async_trait;
//! use flowgraph_core::node::{Node, NodeResult};
//! use flowgraph_core::state::GraphState;
//!
//! #[derive(Clone)]
//! struct Counter(u32);
//!
//! impl GraphState for Counter {
//!     type Update = u32;
//!     fn merge(&mut self, update: u32) {
//!         self.0 += update;
//!     }
//! }
//!
//! struct AddOne;
//!
//! #[async_trait]
//! impl Node<Counter> for AddOne {
//!     async fn run(&self, _state: &Counter) -> NodeResult<u32> {
//!         Ok(1)
//!     }
//! }
//! ```

use crate::error::{BoxError, GraphError, Result};
use crate::graph::{is_reserved, NodeId};
use crate::state::GraphState;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Result type returned by step functions
pub type NodeResult<U> = std::result::Result<U, BoxError>;

/// One step of a graph: reads the state, returns a partial update
///
/// The state reference is a read view of the live container. Any value the
/// node needs after an `.await` point must be read before it or cloned.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    /// Run the step against the current state
    async fn run(&self, state: &S) -> NodeResult<S::Update>;
}

/// Adapter for synchronous closures `Fn(&S) -> NodeResult<S::Update>`
pub struct FnNode<S, F> {
    func: F,
    _state: PhantomData<fn(&S)>,
}

impl<S, F> FnNode<S, F>
where
    S: GraphState,
    F: Fn(&S) -> NodeResult<S::Update> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F> Node<S> for FnNode<S, F>
where
    S: GraphState,
    F: Fn(&S) -> NodeResult<S::Update> + Send + Sync,
{
    async fn run(&self, state: &S) -> NodeResult<S::Update> {
        (self.func)(state)
    }
}

/// Adapter for closures returning a future
///
/// The future must not borrow the state: read what it needs first, then move
/// the owned values into an `async move` block.
///
/// ```rust
/// use flowgraph_core::node::{AsyncFnNode, NodeResult};
/// # use flowgraph_core::state::GraphState;
/// # #[derive(Clone)] struct Doc { text: String }
/// # impl GraphState for Doc { type Update = String; fn merge(&mut self, u: String) { self.text = u; } }
///
/// let shout = AsyncFnNode::new(|state: &Doc| {
///     let text = state.text.clone();
///     async move { NodeResult::Ok(text.to_uppercase()) }
/// });
/// # let _: AsyncFnNode<Doc, _> = shout;
/// ```
pub struct AsyncFnNode<S, F> {
    func: F,
    _state: PhantomData<fn(&S)>,
}

impl<S, F, Fut> AsyncFnNode<S, F>
where
    S: GraphState,
    F: Fn(&S) -> Fut + Send + Sync,
    Fut: Future<Output = NodeResult<S::Update>> + Send,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for AsyncFnNode<S, F>
where
    S: GraphState,
    F: Fn(&S) -> Fut + Send + Sync,
    Fut: Future<Output = NodeResult<S::Update>> + Send,
{
    async fn run(&self, state: &S) -> NodeResult<S::Update> {
        (self.func)(state).await
    }
}

/// Shared handle to a registered step function
pub type NodeHandle<S> = Arc<dyn Node<S>>;

/// Map from unique node name to step function
pub struct NodeRegistry<S: GraphState> {
    nodes: BTreeMap<NodeId, NodeHandle<S>>,
}

impl<S: GraphState> NodeRegistry<S> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Register a step function under `name`
    ///
    /// # Errors
    ///
    /// - [`GraphError::ReservedNodeName`] for `__start__` and `__end__`
    /// - [`GraphError::DuplicateNode`] if the name is taken
    pub fn register(&mut self, name: impl Into<NodeId>, node: NodeHandle<S>) -> Result<()> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(GraphError::ReservedNodeName(name));
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        tracing::trace!(node = %name, "Registered node");
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Fetch the step function registered under `name`
    pub fn lookup(&self, name: &str) -> Result<&NodeHandle<S>> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Registered names in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<S: GraphState> Default for NodeRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
