//! Evaluation cells and their typed outcomes.

use serde::{Deserialize, Serialize};

use crate::config::ModelDescriptor;
use crate::registry::TokenUsage;

/// Identity of one evaluation: (puzzle, framework, model, run number).
///
/// `run_number` ranges `1..=N` and is purely an ordinal for repeated
/// sampling; runs do not depend on each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationCell {
    pub puzzle: String,
    pub framework: String,
    pub model: ModelDescriptor,
    pub run_number: u32,
}

impl std::fmt::Display for EvaluationCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/run_{}",
            self.puzzle,
            self.framework,
            self.model.display_name(),
            self.run_number
        )
    }
}

/// Verdict for one evaluation cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStatus {
    /// Agent produced a result the checker accepted.
    Pass,
    /// Anything went wrong: resolution, execution, validation, or timeout.
    Fail,
    /// The framework has no implementation for this puzzle. Excluded from
    /// pass-rate math.
    NotAvailable,
}

impl std::fmt::Display for EvalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalStatus::Pass => write!(f, "Pass"),
            EvalStatus::Fail => write!(f, "Fail"),
            EvalStatus::NotAvailable => write!(f, "Not Available"),
        }
    }
}

/// Outcome of one evaluation cell. Created exactly once per cell and
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub puzzle: String,
    pub framework: String,
    /// Display form of the model identifier.
    pub model: String,
    pub run_number: u32,
    pub status: EvalStatus,
    /// Failure detail; `None` on Pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Wall-clock seconds, recorded on every exit path.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
}

impl EvaluationResult {
    fn base(cell: &EvaluationCell, status: EvalStatus, execution_time: f64) -> Self {
        Self {
            puzzle: cell.puzzle.clone(),
            framework: cell.framework.clone(),
            model: cell.model.display_name().to_string(),
            run_number: cell.run_number,
            status,
            error_message: None,
            execution_time,
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// A passing result.
    pub fn pass(cell: &EvaluationCell, execution_time: f64) -> Self {
        Self::base(cell, EvalStatus::Pass, execution_time)
    }

    /// A failing result with the underlying error text.
    pub fn fail(cell: &EvaluationCell, execution_time: f64, error: impl Into<String>) -> Self {
        let mut result = Self::base(cell, EvalStatus::Fail, execution_time);
        result.error_message = Some(error.into());
        result
    }

    /// A configuration-gap result: no implementation for this pairing.
    pub fn not_available(cell: &EvaluationCell, execution_time: f64) -> Self {
        let mut result = Self::base(cell, EvalStatus::NotAvailable, execution_time);
        result.error_message = Some(format!("No implementation for {} puzzle", cell.puzzle));
        result
    }

    /// Attaches token usage when the framework reported it.
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        if let Some(usage) = usage {
            self.prompt_tokens = usage.prompt_tokens;
            self.completion_tokens = usage.completion_tokens;
        }
        self
    }
}
