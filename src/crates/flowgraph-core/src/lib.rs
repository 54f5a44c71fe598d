//! # flowgraph-core - Typed State-Graph Workflows
//!
//! A small execution engine for workflows expressed as directed graphs of named
//! steps that share one typed state value.
//!
//! ## Overview
//!
//! - **Typed state** - a user struct implementing [`GraphState`]; nodes return a
//!   delta, the executor merges it field by field
//! - **Merge policies** - replace-on-write fields via [`Patch`], reducible fields
//!   via a [`Reducer`] such as [`Append`]
//! - **Conditional routing** - dispatchers inspect the merged state and return a
//!   label; closed label enums are checked for full coverage at compile time
//! - **Validation up front** - dangling targets, missing entry points and dead
//!   ends are rejected by [`StateGraph::compile`] before anything runs
//! - **Streaming** - a lazy per-step stream of state snapshots
//! - **Definition files** - topology in YAML, step functions resolved by name
//!
//! ## Execution Model
//!
//! ```text
//!   initial state
//!        │
//!        ▼
//!   ┌──────────┐  delta   ┌─────────┐  merged state  ┌──────────────┐
//!   │  node N  │ ───────► │  merge  │ ─────────────► │ resolve edge │
//!   └──────────┘          └─────────┘                └──────┬───────┘
//!        ▲                                                  │
//!        └──────────────── Node(next) ◄─────────────────────┤
//!                                                           ▼
//!                                                   End: final state
//! ```
//!
//! One node runs at a time. There is no persistence, no parallel branch
//! execution, and no retry: the first error ends the run.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph_core::{Append, GraphState, Message, Patch, Reducer, StateGraph, END};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Chat {
//!     messages: Vec<Message>,
//!     topic: Option<String>,
//! }
//!
//! #[derive(Default)]
//! struct ChatUpdate {
//!     messages: Vec<Message>,
//!     topic: Patch<String>,
//! }
//!
//! impl GraphState for Chat {
//!     type Update = ChatUpdate;
//!
//!     fn merge(&mut self, update: ChatUpdate) {
//!         Append::reduce(&mut self.messages, update.messages);
//!         update.topic.apply_to(&mut self.topic);
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = StateGraph::<Chat>::new();
//! graph
//!     .add_node("classify", |_: &Chat| {
//!         Ok(ChatUpdate { topic: Patch::Set("weather".into()), ..Default::default() })
//!     })?
//!     .add_node("reply", |s: &Chat| {
//!         let topic = s.topic.clone().unwrap_or_default();
//!         Ok(ChatUpdate {
//!             messages: vec![Message::assistant(format!("Let's talk about {topic}"))],
//!             ..Default::default()
//!         })
//!     })?
//!     .set_entry_point("classify")?
//!     .add_edge("classify", "reply")?
//!     .add_edge("reply", END)?;
//!
//! let app = graph.compile()?;
//! let state = app.invoke(Chat::default()).await?;
//! assert_eq!(state.messages[0].content, "Let's talk about weather");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`state`] - [`GraphState`], [`Patch`], reducers
//! - [`node`] - step functions and the node registry
//! - [`edge`] - direct and conditional edges, label types
//! - [`builder`] - [`StateGraph`] and the compiler
//! - [`compiled`] - [`CompiledGraph`], `invoke` and `stream`
//! - [`config`] - [`RunConfig`], [`CancelHandle`], [`CompileOptions`]
//! - [`yaml`] - [`GraphDefinition`] and [`HandlerRegistry`]
//! - [`messages`] - role-tagged conversation records

pub mod builder;
pub mod compiled;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod messages;
pub mod node;
pub mod state;
pub mod yaml;

// Re-export main types
pub use builder::StateGraph;
pub use compiled::{CompiledGraph, ExecutionFailure, StepEvent, StepStream};
pub use config::{CancelHandle, CompileOptions, DeadEndPolicy, RunConfig};
pub use edge::{ClosedLabel, RouteError, RouteLabel};
pub use error::{BoxError, CompileError, GraphError, Result};
pub use graph::{NodeId, Target, END, START};
pub use messages::{Message, MessageRole};
pub use node::{AsyncFnNode, FnNode, Node, NodeResult};
pub use state::{Append, GraphState, Overwrite, Patch, Reducer};
pub use yaml::{GraphDefinition, HandlerRegistry};
