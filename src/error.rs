//! Error types for agent-gym operations.
//!
//! Defines error types for the major subsystems:
//! - Configuration loading and validation
//! - Agent framework adapters
//! - Puzzle checkers
//! - The memoizing call cache
//! - Report persistence
//!
//! All of these are absorbed at the cell-executor boundary and converted
//! into an `EvaluationResult`; nothing below the runner surfaces them as
//! process failures.

use thiserror::Error;

/// Errors that can occur while loading or validating evaluation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file '{0}' not found")]
    NotFound(String),

    #[error("No puzzles configured")]
    NoPuzzles,

    #[error("Combination group {index} has an empty {field} list")]
    EmptyGroupField { index: usize, field: &'static str },

    #[error("Repeat count must be at least 1, got {0}")]
    InvalidRunCount(u32),

    #[error("Per-cell timeout must be at least 1 second, got {0}")]
    InvalidTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by agent framework adapters while driving a model.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{framework} framework does not support this model config: {reason}")]
    UnsupportedModelConfig { framework: String, reason: String },

    #[error("API request failed: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("Network error connecting to {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Agent exceeded maximum tool-call turns ({0})")]
    TurnLimitExceeded(usize),
}

/// Validation failure raised by a puzzle checker.
///
/// The message must be specific about what mismatched (expected vs. actual),
/// since it is surfaced verbatim in the evaluation report.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CheckError(pub String);

impl CheckError {
    /// Create a checker failure with a descriptive message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from the on-disk memoizing call cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read cache entry '{key}': {message}")]
    Read { key: String, message: String },

    #[error("Failed to store cache entry '{key}': {message}")]
    Store { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while persisting evaluation reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to create reports directory '{path}': {message}")]
    DirectoryCreation { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
