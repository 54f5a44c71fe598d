//! # flowgraph
//!
//! Runs the complex RAG demo pipeline and works with graph definition files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowgraph_cli::commands;
use flowgraph_cli::CliConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowgraph")]
#[command(about = "flowgraph CLI - Run and inspect state-graph workflows", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a flowgraph.toml config file
    #[arg(short, long, global = true, env = "FLOWGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo pipeline, or a definition file using its handlers
    Run {
        /// Graph definition file (defaults to the built-in pipeline)
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Initial state as JSON
        #[arg(short, long)]
        input: Option<String>,

        /// Print one JSON line per executed node
        #[arg(long)]
        stream: bool,

        /// Abort the run after this many milliseconds (0 disables)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum number of node executions (0 disables)
        #[arg(long)]
        recursion_limit: Option<usize>,
    },

    /// Validate a YAML graph definition against the demo handlers
    Validate {
        /// Path to YAML file
        file: PathBuf,
    },

    /// Check graph structure
    Check {
        /// Path to YAML file
        file: PathBuf,
    },

    /// Print the built-in pipeline as YAML
    Export,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing/logging
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            graph,
            input,
            stream,
            timeout_ms,
            recursion_limit,
        } => {
            let config = config.with_overrides(recursion_limit, timeout_ms);
            let app = commands::load_graph(graph.as_deref(), &config)?;
            let state = commands::parse_input(input.as_deref())?;
            tracing::info!(user_id = %state.user_id, session_id = %state.session_id, "Running graph");

            if stream {
                let steps =
                    commands::run_streamed(&app, state, &config, |line| println!("{}", line)).await?;
                tracing::info!(steps, "Streamed run finished");
            } else {
                println!("{}", commands::run(&app, state, &config).await?);
            }
        }
        Commands::Validate { file } => {
            println!("Validating: {}", file.display());
            println!("{}", commands::validate(&file, &config)?);
        }
        Commands::Check { file } => {
            println!("Checking graph structure: {}", file.display());
            println!("{}", commands::check(&file)?);
        }
        Commands::Export => {
            print!("{}", commands::export()?);
        }
    }

    Ok(())
}
