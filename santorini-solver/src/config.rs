//! Search and solver configuration.
//!
//! Configuration is resolved in this order:
//! 1. An explicit path (the `--config` flag); read or parse errors are fatal
//! 2. The path in `SANTORINI_CONFIG`
//! 3. `santorini.toml` in the working directory
//! 4. Built-in defaults
//!
//! Environment overrides (`SANTORINI_MODE`, `SANTORINI_MAX_NODES`,
//! `SANTORINI_MAX_MEMO`) are applied last.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SANTORINI_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "santorini.toml";

/// How many children of each node the search expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Visit every child until a winning one is found.
    #[default]
    Exhaustive,
    /// Visit only the top-ranked child. Results are estimates.
    BestFirst,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Exhaustive => f.write_str("exhaustive"),
            SearchMode::BestFirst => f.write_str("best_first"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaustive" => Ok(SearchMode::Exhaustive),
            "best_first" | "best-first" | "bestfirst" => Ok(SearchMode::BestFirst),
            other => Err(format!("unknown search mode: {}", other)),
        }
    }
}

/// Parameters for one search session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Expansion strategy.
    pub mode: SearchMode,

    /// Node visits allowed per session before entries return undecided.
    pub max_nodes: u64,

    /// Memo entries allowed before entries return undecided.
    pub max_memo_entries: usize,

    /// Terminal states the sampler collects per child. 0 disables ordering.
    pub sample_leaf_limit: usize,

    /// Nodes the sampler may dequeue per child.
    pub sample_node_budget: usize,

    /// Seconds between progress log lines.
    pub log_interval_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Exhaustive,
            max_nodes: 50_000_000,
            max_memo_entries: 20_000_000,
            sample_leaf_limit: 32,
            sample_node_budget: 2_000,
            log_interval_secs: 5,
        }
    }
}

impl SearchConfig {
    /// Small budgets for tests and quick checks.
    pub fn for_testing() -> Self {
        Self {
            max_nodes: 100_000,
            max_memo_entries: 100_000,
            sample_leaf_limit: 8,
            sample_node_budget: 200,
            log_interval_secs: 3600,
            ..Self::default()
        }
    }

    /// Builder pattern: set search mode.
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder pattern: set node visit budget.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Builder pattern: set memo size budget.
    pub fn with_max_memo_entries(mut self, max_memo_entries: usize) -> Self {
        self.max_memo_entries = max_memo_entries;
        self
    }

    /// Builder pattern: set sampler leaf limit and visit budget.
    pub fn with_sampling(mut self, leaf_limit: usize, node_budget: usize) -> Self {
        self.sample_leaf_limit = leaf_limit;
        self.sample_node_budget = node_budget;
        self
    }

    /// Builder pattern: set progress log interval.
    pub fn with_log_interval(mut self, secs: u64) -> Self {
        self.log_interval_secs = secs;
        self
    }
}

/// Top-level configuration for the `solver` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Where resolved memo entries are loaded from and saved to.
    pub checkpoint_path: Option<PathBuf>,

    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_level: String,

    pub search: SearchConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: Some(PathBuf::from("data/santorini.bin")),
            log_level: "santorini_solver=info".to_string(),
            search: SearchConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a TOML file without applying environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the configuration and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::load_from_path(path)?
            }
            None => Self::discover()?,
        };
        config.apply_overrides(|key| std::env::var(key).ok())
    }

    fn discover() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                info!("Loading config from {}: {}", CONFIG_ENV, path.display());
                return Self::load_from_path(&path);
            }
            warn!(
                "{}={} not found, searching defaults",
                CONFIG_ENV,
                path.display()
            );
        }

        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return Self::load_from_path(path);
        }

        debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
        Ok(Self::default())
    }

    /// Apply `SANTORINI_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SANTORINI_MODE") {
            self.search.mode = value.parse().map_err(|_| ConfigError::InvalidOverride {
                key: "SANTORINI_MODE",
                value: value.clone(),
            })?;
            debug!(mode = %self.search.mode, "mode overridden from environment");
        }
        if let Some(value) = lookup("SANTORINI_MAX_NODES") {
            self.search.max_nodes =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        key: "SANTORINI_MAX_NODES",
                        value: value.clone(),
                    })?;
            debug!(max_nodes = self.search.max_nodes, "node budget overridden from environment");
        }
        if let Some(value) = lookup("SANTORINI_MAX_MEMO") {
            self.search.max_memo_entries =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        key: "SANTORINI_MAX_MEMO",
                        value: value.clone(),
                    })?;
            debug!(
                max_memo_entries = self.search.max_memo_entries,
                "memo budget overridden from environment"
            );
        }
        Ok(self)
    }
}
