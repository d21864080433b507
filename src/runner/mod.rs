//! Evaluation matrix orchestration.
//!
//! This module is the core of agent-gym: it expands a configuration into a
//! run matrix, executes each cell with isolation and failure classification,
//! and aggregates the outcomes.
//!
//! # Architecture
//!
//! ```text
//! EvalConfig → MatrixRunner → CellExecutor (per cell) → EvaluationResult*
//!                                                   → EvaluationSummary → report
//! ```
//!
//! The runner is strictly sequential: one cell fully completes (including
//! any suspension inside the agent call) before the next starts, because
//! the puzzle tool layer holds shared mutable state with no per-cell
//! isolation. The executor never fails — every error becomes a typed
//! result — so no single cell can abort the matrix.

pub mod executor;
pub mod matrix;
pub mod result;
pub mod summary;

pub use executor::CellExecutor;
pub use matrix::MatrixRunner;
pub use result::{EvalStatus, EvaluationCell, EvaluationResult};
pub use summary::{EvaluationSummary, FrameworkBreakdown, PuzzleBreakdown};
