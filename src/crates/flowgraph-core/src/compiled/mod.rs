//! Compiled graph: the immutable, executable form of a [`StateGraph`](crate::StateGraph)
//!
//! # Module Structure
//!
//! - `graph` - [`CompiledGraph`] and its structural accessors
//! - `execution` - the run loop and [`CompiledGraph::invoke`]
//! - `streaming` - [`CompiledGraph::stream`], one event per executed node
//! - `types` - [`StepEvent`], [`ExecutionFailure`], [`StepStream`]

mod execution;
mod graph;
mod streaming;
mod types;

pub use graph::CompiledGraph;
pub use types::{ExecutionFailure, StepEvent, StepStream};
