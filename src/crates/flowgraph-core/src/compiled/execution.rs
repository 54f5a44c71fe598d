//! Graph execution
//!
//! The executor is a two-state machine:
//!
//! ```text
//!            ┌──────────── next = Node(n) ───────────┐
//!            ▼                                       │
//!   Running(entry) ── run step, merge, resolve ──────┤
//!                                                    │
//!                                 next = End ──► Done (return state)
//! ```
//!
//! Exactly one node runs at a time. The next node is always resolved against
//! the state *after* the current node's update has been merged. Any error stops
//! the run at once; nothing is retried.

use super::graph::GraphInner;
use super::types::ExecutionFailure;
use super::CompiledGraph;
use crate::config::RunConfig;
use crate::error::{GraphError, Result};
use crate::graph::{NodeId, Target};
use crate::state::GraphState;
use std::sync::Arc;
use uuid::Uuid;

/// Mutable part of one invocation
pub(crate) struct RunLoop<S: GraphState> {
    graph: Arc<GraphInner<S>>,
    config: RunConfig,
    pub(crate) state: S,
    current: Option<NodeId>,
    last: Option<NodeId>,
    pub(crate) steps: usize,
}

impl<S: GraphState> RunLoop<S> {
    pub(crate) fn new(graph: Arc<GraphInner<S>>, state: S, config: RunConfig) -> Self {
        let entry = graph.entry.clone();
        Self {
            graph,
            config,
            state,
            current: Some(entry),
            last: None,
            steps: 0,
        }
    }

    /// Execute the current node and advance
    ///
    /// Returns the name of the node that ran, or `None` once the run is done.
    pub(crate) async fn tick(&mut self) -> Result<Option<NodeId>> {
        let Some(node_id) = self.current.take() else {
            return Ok(None);
        };

        if self.config.is_cancelled() {
            tracing::info!(after = ?self.last, "Run cancelled");
            return Err(GraphError::Cancelled {
                after: self.last.clone(),
            });
        }
        if let Some(limit) = self.config.recursion_limit {
            if self.steps >= limit {
                tracing::warn!(limit, node = %node_id, "Step limit reached");
                return Err(GraphError::RecursionLimit {
                    limit,
                    node: node_id,
                });
            }
        }

        let node = self.graph.nodes.lookup(&node_id)?;
        tracing::debug!(node = %node_id, step = self.steps + 1, "Executing node");

        let update = node
            .run(&self.state)
            .await
            .map_err(|source| GraphError::step_execution(node_id.clone(), source))?;
        self.state.merge(update);
        self.steps += 1;

        let next = self.graph.next(&node_id, &self.state)?;
        tracing::debug!(node = %node_id, next = %next, "Node completed");

        self.current = match next {
            Target::Node(id) => Some(id),
            Target::End => None,
        };
        self.last = Some(node_id.clone());
        Ok(Some(node_id))
    }

    pub(crate) fn into_failure(self, error: GraphError) -> ExecutionFailure<S> {
        ExecutionFailure {
            error,
            state: self.state,
            steps: self.steps,
        }
    }
}

impl<S: GraphState> CompiledGraph<S> {
    /// Run the graph to completion and return the final state
    ///
    /// # Errors
    ///
    /// The first error raised by input validation, a step function, or edge
    /// resolution. Use [`invoke_with_config`](Self::invoke_with_config) to also
    /// get the partially merged state back.
    pub async fn invoke(&self, input: S) -> Result<S> {
        self.invoke_with_config(input, &RunConfig::default())
            .await
            .map_err(ExecutionFailure::into_error)
    }

    /// Run the graph with explicit run settings
    ///
    /// On failure the returned [`ExecutionFailure`] carries the state with
    /// every update merged before the failing step.
    #[tracing::instrument(skip_all, fields(run_id = %Uuid::new_v4(), entry = %self.inner.entry))]
    pub async fn invoke_with_config(
        &self,
        input: S,
        config: &RunConfig,
    ) -> std::result::Result<S, ExecutionFailure<S>> {
        tracing::info!("Starting graph execution");

        if let Err(reason) = input.validate() {
            tracing::error!(%reason, "Initial state rejected");
            return Err(ExecutionFailure {
                error: GraphError::InvalidInput(reason),
                state: input,
                steps: 0,
            });
        }

        let mut run = RunLoop::new(Arc::clone(&self.inner), input, config.clone());
        loop {
            match run.tick().await {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(error) => {
                    tracing::error!(error = %error, steps = run.steps, "Graph execution failed");
                    return Err(run.into_failure(error));
                }
            }
        }

        tracing::info!(steps = run.steps, "Graph execution completed");
        Ok(run.state)
    }
}
