//! agent-gym: Evaluation matrix orchestrator for agent frameworks.
//!
//! This library expands a declarative configuration into an evaluation
//! matrix (puzzles x frameworks x models x repeated runs), executes each
//! cell against live model endpoints, and aggregates the outcomes into
//! summary reports.

// Core modules
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod frameworks;
pub mod puzzles;
pub mod registry;
pub mod report;
pub mod runner;

// Re-export commonly used error types
pub use error::{AgentError, CacheError, CheckError, ConfigError, ReportError};
