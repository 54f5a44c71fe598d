//! # flowgraph-cli
//!
//! The complex RAG demo pipeline and the `flowgraph` command-line tool that
//! runs it, validates graph definition files, and exports the built-in
//! topology.

pub mod commands;
pub mod config;
pub mod pipeline;

pub use config::CliConfig;
pub use pipeline::{RagState, RagUpdate};
