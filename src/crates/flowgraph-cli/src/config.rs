//! CLI configuration
//!
//! Settings are layered: built-in defaults, then a `flowgraph.toml` file, then
//! command-line flags. The file is taken from `--config`, the `FLOWGRAPH_CONFIG`
//! environment variable, or `./flowgraph.toml`, in that order. A missing file
//! is only an error when it was named explicitly.

use flowgraph_core::{CompileOptions, DeadEndPolicy, RunConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "flowgraph.toml";

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "FLOWGRAPH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// `[run]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Maximum node executions per run; `0` disables the limit
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: Option<usize>,

    /// Wall-clock budget for one run; `0` disables the timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_recursion_limit() -> Option<usize> {
    Some(50)
}

fn default_timeout_ms() -> Option<u64> {
    Some(30_000)
}

/// `[graph]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    #[serde(default)]
    pub dead_end_policy: DeadEndPolicy,
}

/// Complete CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub graph: GraphSettings,
}

impl CliConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the config file and load it, falling back to defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.exists() {
            return Self::from_file(default);
        }
        Ok(Self::default())
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, recursion_limit: Option<usize>, timeout_ms: Option<u64>) -> Self {
        if recursion_limit.is_some() {
            self.run.recursion_limit = recursion_limit;
        }
        if timeout_ms.is_some() {
            self.run.timeout_ms = timeout_ms;
        }
        self
    }

    pub fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::new();
        config.recursion_limit = self.run.recursion_limit.filter(|&limit| limit > 0);
        config
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::new().with_dead_end_policy(self.graph.dead_end_policy)
    }

    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.run
            .timeout_ms
            .filter(|&ms| ms > 0)
            .map(std::time::Duration::from_millis)
    }
}
