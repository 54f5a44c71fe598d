//! Step-by-step streaming of a run
//!
//! Streaming runs the same loop as [`CompiledGraph::invoke`], yielding a
//! [`StepEvent`] with a snapshot of the state after every merge. The stream is
//! lazy: no node executes until the consumer polls it, and dropping the stream
//! stops the run before the next node.

use super::execution::RunLoop;
use super::types::{StepEvent, StepStream};
use super::CompiledGraph;
use crate::config::RunConfig;
use crate::error::{GraphError, Result};
use crate::state::GraphState;
use std::sync::Arc;
use uuid::Uuid;

impl<S: GraphState> CompiledGraph<S> {
    /// Stream one event per executed node
    ///
    /// The last item is either the event of the node that routed to the end,
    /// or the error that stopped the run. Nothing is yielded after an error.
    pub fn stream(&self, input: S) -> StepStream<S> {
        self.stream_with_config(input, &RunConfig::default())
    }

    /// Stream with explicit run settings
    pub fn stream_with_config(&self, input: S, config: &RunConfig) -> StepStream<S> {
        let graph = Arc::clone(&self.inner);
        let config = config.clone();
        let run_id = Uuid::new_v4();

        let events = async_stream::stream! {
            if let Err(reason) = input.validate() {
                tracing::error!(%run_id, %reason, "Initial state rejected");
                yield Err::<StepEvent<S>, GraphError>(GraphError::InvalidInput(reason));
                return;
            }

            tracing::info!(%run_id, entry = %graph.entry, "Starting streamed graph execution");
            let mut run = RunLoop::new(graph, input, config);
            loop {
                let ticked: Result<_> = run.tick().await;
                match ticked {
                    Ok(Some(node)) => {
                        yield Ok(StepEvent {
                            step: run.steps,
                            node,
                            state: run.state.clone(),
                        });
                    }
                    Ok(None) => {
                        tracing::info!(%run_id, steps = run.steps, "Streamed graph execution completed");
                        break;
                    }
                    Err(error) => {
                        tracing::error!(%run_id, error = %error, steps = run.steps, "Streamed graph execution failed");
                        yield Err(error);
                        break;
                    }
                }
            }
        };

        Box::pin(events)
    }
}
