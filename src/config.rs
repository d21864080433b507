//! Evaluation configuration: puzzles, framework-model combinations, repeats.
//!
//! The configuration is read once at process start and stays immutable for
//! the whole run. Combination groups exist because not every framework
//! supports every model: OpenAI-compatible HTTP frameworks only accept
//! custom endpoint descriptors, while hosted-model frameworks take bare
//! model identifier strings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A model the matrix can run against.
///
/// Either an opaque hosted-model identifier or a structured descriptor for
/// an OpenAI-compatible custom endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelDescriptor {
    /// Hosted model reference, e.g. `"mistral.mistral-large-2407-v1:0"`.
    Hosted(String),
    /// A self-hosted OpenAI-compatible endpoint.
    CustomEndpoint {
        /// Display name used in logs and reports.
        name: String,
        /// Base URL of the endpoint, e.g. `http://127.0.0.1:1234/v1`.
        base_url: String,
        /// Model name to request from the endpoint.
        model: String,
    },
}

impl ModelDescriptor {
    /// Create a custom endpoint descriptor.
    pub fn custom_endpoint(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::CustomEndpoint {
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Display-friendly model identifier for logs and reports.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Hosted(id) => id,
            Self::CustomEndpoint { name, .. } => name,
        }
    }
}

impl From<&str> for ModelDescriptor {
    fn from(id: &str) -> Self {
        Self::Hosted(id.to_string())
    }
}

/// A set of frameworks paired with the models they are valid together with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationGroup {
    /// Framework identifiers in configured order.
    pub frameworks: Vec<String>,
    /// Model descriptors in configured order.
    pub models: Vec<ModelDescriptor>,
}

/// Full evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Puzzle identifiers in configured order.
    pub puzzles: Vec<String>,
    /// Framework-model combination groups in configured order.
    pub combinations: Vec<CombinationGroup>,
    /// Number of runs per (puzzle, framework, model) combination.
    #[serde(default = "default_num_runs")]
    pub num_runs: u32,
    /// Per-cell timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory evaluation reports are written to.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    /// Optional directory for the memoizing call cache. Unset disables caching.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_num_runs() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("./reports")
}

impl EvalConfig {
    /// Creates a configuration with the default puzzle battery and no
    /// combinations. Callers add groups via [`EvalConfig::with_group`].
    pub fn new() -> Self {
        Self {
            puzzles: vec!["fruit_count".to_string(), "towers_of_hanoi".to_string()],
            combinations: Vec::new(),
            num_runs: default_num_runs(),
            timeout_secs: default_timeout_secs(),
            reports_dir: default_reports_dir(),
            cache_dir: None,
        }
    }

    /// Loads and validates a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the puzzle list.
    pub fn with_puzzles(mut self, puzzles: Vec<String>) -> Self {
        self.puzzles = puzzles;
        self
    }

    /// Appends a combination group.
    pub fn with_group(mut self, group: CombinationGroup) -> Self {
        self.combinations.push(group);
        self
    }

    /// Sets the repeat count.
    pub fn with_num_runs(mut self, num_runs: u32) -> Self {
        self.num_runs = num_runs;
        self
    }

    /// Sets the per-cell timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the reports directory.
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Enables the agent-call cache under the given directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Per-cell timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration invariants.
    ///
    /// Every group's frameworks and models lists must be non-empty, and the
    /// repeat count and timeout must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.puzzles.is_empty() {
            return Err(ConfigError::NoPuzzles);
        }
        for (index, group) in self.combinations.iter().enumerate() {
            if group.frameworks.is_empty() {
                return Err(ConfigError::EmptyGroupField {
                    index,
                    field: "frameworks",
                });
            }
            if group.models.is_empty() {
                return Err(ConfigError::EmptyGroupField {
                    index,
                    field: "models",
                });
            }
        }
        if self.num_runs == 0 {
            return Err(ConfigError::InvalidRunCount(self.num_runs));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }
        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::new()
    }
}
