//! YAML-based graph definitions
//!
//! A definition file describes topology only. Step functions and dispatchers
//! stay in Rust and are looked up by name in a [`HandlerRegistry`]:
//!
//! ```yaml
//! name: greeting
//! entry: hello
//! nodes:
//!   hello: { handler: say_hello }
//!   goodbye: { handler: say_goodbye }
//! edges:
//!   - { from: hello, to: goodbye }
//!   - from: goodbye
//!     condition: again
//!     branches: { "yes": hello, "no": __end__ }
//! ```
//!
//! Labels returned by a named condition are strings, so label coverage is
//! checked when the condition runs rather than at compile time.

use crate::builder::StateGraph;
use crate::compiled::CompiledGraph;
use crate::config::CompileOptions;
use crate::error::{GraphError, Result};
use crate::graph::{NodeId, Target};
use crate::node::{FnNode, NodeHandle, NodeResult};
use crate::state::GraphState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Top-level graph definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Graph name
    pub name: String,

    /// Graph description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Entry point node
    pub entry: NodeId,

    /// Node definitions
    pub nodes: BTreeMap<NodeId, NodeDefinition>,

    /// Edge definitions
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,

    /// Nodes that may end the run without an outgoing edge
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminal: Vec<NodeId>,
}

/// Node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Name of the registered step function
    pub handler: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Edge definition
///
/// An edge is either `{from, to}` or `{from, condition, branches}`. Any other
/// key makes the edge invalid, so a conditional edge with a stray `to:` is
/// rejected instead of being read as a direct one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum EdgeDefinition {
    /// Conditional edge
    Conditional {
        from: NodeId,
        condition: String,
        branches: BTreeMap<String, Target>,
    },

    /// Direct edge
    Direct { from: NodeId, to: Target },
}

impl EdgeDefinition {
    /// Node the edge leaves from
    pub fn source(&self) -> &str {
        match self {
            EdgeDefinition::Conditional { from, .. } | EdgeDefinition::Direct { from, .. } => from,
        }
    }
}

impl GraphDefinition {
    /// Load graph definition from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse graph definition from a YAML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Resolve handler names and assemble a builder
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownHandler`] or [`GraphError::UnknownCondition`] for
    /// names missing from `registry`, plus any registration error raised by
    /// [`StateGraph`]. Structural problems surface later, from `compile`.
    pub fn build<S: GraphState>(&self, registry: &HandlerRegistry<S>) -> Result<StateGraph<S>> {
        let mut graph = StateGraph::new();

        for (name, node) in &self.nodes {
            let handler = registry.handler(&node.handler)?;
            graph.add_node_handle(name.clone(), handler)?;
        }

        graph.set_entry_point(self.entry.clone())?;

        for edge in &self.edges {
            match edge {
                EdgeDefinition::Direct { from, to } => {
                    graph.add_edge(from.clone(), to.clone())?;
                }
                EdgeDefinition::Conditional {
                    from,
                    condition,
                    branches,
                } => {
                    let dispatcher = registry.condition(condition)?;
                    let label_map: HashMap<String, Target> = branches
                        .iter()
                        .map(|(label, target)| (label.clone(), target.clone()))
                        .collect();
                    graph.add_conditional_edges(
                        from.clone(),
                        move |state: &S| dispatcher(state),
                        label_map,
                    )?;
                }
            }
        }

        for node in &self.terminal {
            graph.mark_terminal(node.clone());
        }

        tracing::debug!(graph = %self.name, nodes = self.nodes.len(), "Graph definition resolved");
        Ok(graph)
    }

    /// Build and compile with default options
    pub fn compile<S: GraphState>(&self, registry: &HandlerRegistry<S>) -> Result<CompiledGraph<S>> {
        self.build(registry)?.compile()
    }

    /// Build and compile with explicit options
    pub fn compile_with<S: GraphState>(
        &self,
        registry: &HandlerRegistry<S>,
        options: CompileOptions,
    ) -> Result<CompiledGraph<S>> {
        self.build(registry)?.compile_with(options)
    }
}

/// Named dispatcher usable from a definition file
pub type Condition<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Step functions and dispatchers addressable by name
pub struct HandlerRegistry<S: GraphState> {
    handlers: HashMap<String, NodeHandle<S>>,
    conditions: HashMap<String, Condition<S>>,
}

impl<S: GraphState> HandlerRegistry<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            conditions: HashMap::new(),
        }
    }

    /// Register a step function under `name`, replacing any previous one
    pub fn register_handler(&mut self, name: impl Into<String>, node: NodeHandle<S>) -> &mut Self {
        self.handlers.insert(name.into(), node);
        self
    }

    /// Register a synchronous step function under `name`
    pub fn register_fn<F>(&mut self, name: impl Into<String>, step: F) -> &mut Self
    where
        F: Fn(&S) -> NodeResult<S::Update> + Send + Sync + 'static,
    {
        self.register_handler(name, Arc::new(FnNode::new(step)))
    }

    /// Register a dispatcher under `name`, replacing any previous one
    pub fn register_condition<F>(&mut self, name: impl Into<String>, dispatcher: F) -> &mut Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        self.conditions.insert(name.into(), Arc::new(dispatcher));
        self
    }

    pub fn handler(&self, name: &str) -> Result<NodeHandle<S>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownHandler(name.to_string()))
    }

    pub fn condition(&self, name: &str) -> Result<Condition<S>> {
        self.conditions
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownCondition(name.to_string()))
    }

    /// Registered handler names, sorted
    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: GraphState> Default for HandlerRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
