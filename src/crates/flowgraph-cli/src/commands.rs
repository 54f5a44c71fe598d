//! Subcommand implementations
//!
//! Each command returns what it would print so the binary stays a thin
//! dispatcher and the commands can be exercised from tests.

use crate::config::CliConfig;
use crate::pipeline::{self, RagState};
use anyhow::{anyhow, bail, Context, Result};
use flowgraph_core::yaml::{EdgeDefinition, GraphDefinition};
use flowgraph_core::{CompiledGraph, StepEvent};
use futures::StreamExt;
use serde::Serialize;
use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;

/// Initial state used when `run` gets no `--input`
pub const DEFAULT_INPUT: &str = r#"{"session_id": "session_1231", "user_id": "user_4561"}"#;

/// One line of `run --stream` output
#[derive(Debug, Serialize)]
pub struct StepRecord<'a> {
    pub step: usize,
    pub node: &'a str,
    pub state: &'a RagState,
}

impl<'a> From<&'a StepEvent<RagState>> for StepRecord<'a> {
    fn from(event: &'a StepEvent<RagState>) -> Self {
        Self {
            step: event.step,
            node: &event.node,
            state: &event.state,
        }
    }
}

/// Parse the initial state from JSON
pub fn parse_input(input: Option<&str>) -> Result<RagState> {
    let raw = input.unwrap_or(DEFAULT_INPUT);
    serde_json::from_str(raw).context("Input must be a JSON object with session_id and user_id")
}

/// Compile either the built-in pipeline or a definition file against its handlers
pub fn load_graph(graph: Option<&Path>, config: &CliConfig) -> Result<CompiledGraph<RagState>> {
    let options = config.compile_options();
    match graph {
        Some(path) => {
            let definition = GraphDefinition::from_file(path)
                .with_context(|| format!("Failed to load graph definition {}", path.display()))?;
            Ok(definition.compile_with(&pipeline::handlers(), options)?)
        }
        None => Ok(pipeline::build_graph()?.compile_with(options)?),
    }
}

async fn within<F: Future>(config: &CliConfig, fut: F) -> Result<F::Output> {
    match config.timeout() {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| anyhow!("Run exceeded {} ms", limit.as_millis())),
        None => Ok(fut.await),
    }
}

/// Run to completion and return the final state as pretty JSON
pub async fn run(app: &CompiledGraph<RagState>, input: RagState, config: &CliConfig) -> Result<String> {
    let run_config = config.run_config();
    let outcome = within(config, app.invoke_with_config(input, &run_config)).await?;
    match outcome {
        Ok(state) => Ok(serde_json::to_string_pretty(&state)?),
        Err(failure) => {
            tracing::error!(
                steps = failure.steps,
                partial_state = %serde_json::to_string(&failure.state).unwrap_or_default(),
                "Run failed"
            );
            Err(failure.error).context("Graph execution failed")
        }
    }
}

/// Run and hand one JSON line per executed node to `emit`, as it happens
///
/// Returns the number of executed nodes.
pub async fn run_streamed<E>(
    app: &CompiledGraph<RagState>,
    input: RagState,
    config: &CliConfig,
    mut emit: E,
) -> Result<usize>
where
    E: FnMut(String),
{
    let mut events = app.stream_with_config(input, &config.run_config());
    let drain = async {
        let mut steps = 0;
        while let Some(event) = events.next().await {
            let event = event.context("Graph execution failed")?;
            emit(serde_json::to_string(&StepRecord::from(&event))?);
            steps = event.step;
        }
        Ok::<_, anyhow::Error>(steps)
    };
    within(config, drain).await?
}

/// Parse and compile a definition file against the demo handlers
pub fn validate(file: &Path, config: &CliConfig) -> Result<String> {
    let definition = GraphDefinition::from_file(file)
        .with_context(|| format!("Failed to load graph definition {}", file.display()))?;
    let compiled = definition
        .compile_with(&pipeline::handlers(), config.compile_options())
        .context("Graph is invalid")?;

    let mut out = String::new();
    writeln!(out, "✓ Graph is valid")?;
    writeln!(out, "  Graph name: {}", definition.name)?;
    writeln!(out, "  Nodes: {}", compiled.node_names().len())?;
    writeln!(out, "  Edges: {}", definition.edges.len())?;
    write!(out, "  Entry point: {}", compiled.entry())?;
    Ok(out)
}

/// Describe the structure of a definition file without resolving handlers
pub fn check(file: &Path) -> Result<String> {
    let definition = GraphDefinition::from_file(file)
        .with_context(|| format!("Failed to load graph definition {}", file.display()))?;
    if !definition.nodes.contains_key(&definition.entry) {
        bail!("Entry point '{}' is not a defined node", definition.entry);
    }

    let mut out = String::new();
    writeln!(out, "Graph Analysis:")?;
    writeln!(out, "  Name: {}", definition.name)?;
    if let Some(desc) = &definition.description {
        writeln!(out, "  Description: {}", desc)?;
    }
    writeln!(out, "  Entry point: {}", definition.entry)?;

    writeln!(out, "\nNodes ({}):", definition.nodes.len())?;
    for (name, node) in &definition.nodes {
        writeln!(out, "  - {}: {}", name, node.handler)?;
        if let Some(desc) = &node.description {
            writeln!(out, "    {}", desc)?;
        }
    }

    writeln!(out, "\nEdges ({}):", definition.edges.len())?;
    for edge in &definition.edges {
        match edge {
            EdgeDefinition::Direct { from, to } => {
                writeln!(out, "  - {} -> {}", from, to)?;
            }
            EdgeDefinition::Conditional {
                from,
                condition,
                branches,
            } => {
                writeln!(out, "  - {} -> [conditional: {}]", from, condition)?;
                for (label, target) in branches {
                    writeln!(out, "      {} -> {}", label, target)?;
                }
            }
        }
    }

    let no_edge: Vec<&str> = definition
        .nodes
        .keys()
        .map(String::as_str)
        .filter(|name| {
            !definition.edges.iter().any(|e| e.source() == *name)
                && !definition.terminal.iter().any(|t| t == name)
        })
        .collect();
    if !no_edge.is_empty() {
        write!(out, "\nNodes without outgoing edge: {}", no_edge.join(", "))?;
    }
    Ok(out.trim_end().to_string())
}

/// The built-in pipeline as YAML
pub fn export() -> Result<String> {
    Ok(pipeline::definition().to_yaml()?)
}
