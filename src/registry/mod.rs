//! Checker and agent-runner registries.
//!
//! Frameworks and puzzles are wired together through explicit lookup tables
//! rather than dynamic dispatch by string-built module paths. Absence of a
//! (framework, puzzle) entry is a plain configuration gap — not every
//! framework implements every puzzle — and the executor classifies it as
//! `NotAvailable` by lookup, with no error-message inspection involved.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ModelDescriptor;
use crate::error::{AgentError, CheckError};

/// Token usage reported by an agent run, when the framework can observe it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt(s) sent to the model.
    pub prompt_tokens: Option<u32>,
    /// Tokens generated by the model.
    pub completion_tokens: Option<u32>,
    /// Total tokens, if the upstream reports it.
    pub total_tokens: Option<u32>,
}

/// The single return shape for agent runs.
///
/// Frameworks that cannot observe token usage leave `usage` unset; the
/// executor unpacks it into the evaluation result either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// The task result handed to the puzzle checker.
    pub result: Value,
    /// Token usage for the run, if known.
    pub usage: Option<TokenUsage>,
}

impl AgentOutcome {
    /// An outcome with no usage information.
    pub fn new(result: Value) -> Self {
        Self {
            result,
            usage: None,
        }
    }

    /// Attaches token usage to the outcome.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Validation predicate for a puzzle's expected solved state.
///
/// Implementations must tolerate raw JSON objects, typed response records
/// serialized to JSON, and free text containing an embedded JSON object
/// (attempt extraction before giving up). A returned error message must say
/// what mismatched, expected vs. actual.
pub trait Checker: Send + Sync {
    /// Validates an agent's result, returning a descriptive error on failure.
    fn check(&self, result: &Value) -> Result<(), CheckError>;
}

/// Per-framework entry point that drives a model against a puzzle's tools.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Runs the agent with the given model descriptor.
    ///
    /// Must return [`AgentError::UnsupportedModelConfig`] when handed a
    /// model shape this framework does not handle (e.g. a bare hosted-model
    /// identifier given to an endpoint-only framework).
    async fn run(&self, model: &ModelDescriptor) -> Result<AgentOutcome, AgentError>;
}

/// Lookup tables mapping puzzles to checkers and (framework, puzzle) pairs
/// to agent runners.
#[derive(Default)]
pub struct EvalRegistry {
    checkers: HashMap<String, Arc<dyn Checker>>,
    agents: HashMap<(String, String), Arc<dyn AgentRunner>>,
}

impl EvalRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a checker for a puzzle.
    pub fn with_checker(mut self, puzzle: impl Into<String>, checker: Arc<dyn Checker>) -> Self {
        self.checkers.insert(puzzle.into(), checker);
        self
    }

    /// Registers an agent runner for a (framework, puzzle) pair.
    pub fn with_agent(
        mut self,
        framework: impl Into<String>,
        puzzle: impl Into<String>,
        runner: Arc<dyn AgentRunner>,
    ) -> Self {
        self.agents
            .insert((framework.into(), puzzle.into()), runner);
        self
    }

    /// Resolves the checker for a puzzle.
    pub fn checker(&self, puzzle: &str) -> Option<Arc<dyn Checker>> {
        self.checkers.get(puzzle).cloned()
    }

    /// Resolves the agent entry point for a (framework, puzzle) pair.
    ///
    /// `None` is the ConfigurationGap case: the framework has no
    /// implementation for this puzzle.
    pub fn agent(&self, framework: &str, puzzle: &str) -> Option<Arc<dyn AgentRunner>> {
        self.agents
            .get(&(framework.to_string(), puzzle.to_string()))
            .cloned()
    }

    /// Number of registered agent entries.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of registered checkers.
    pub fn checker_count(&self) -> usize {
        self.checkers.len()
    }
}
