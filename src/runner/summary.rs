//! Result aggregation: pure functions over the ordered result list.
//!
//! The summary owns the results and a timestamp; every statistic is
//! computed on demand so there is no cached count to drift out of sync.
//! NotAvailable results are configuration gaps, not attempts — they are
//! excluded from success-rate numerators and denominators alike.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{EvalStatus, EvaluationResult};

/// Immutable record of a completed (or partially completed) evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Results in cell expansion order.
    pub results: Vec<EvaluationResult>,
    /// Number of results (list length).
    pub total_runs: usize,
    /// When the summary was created.
    pub timestamp: DateTime<Utc>,
}

/// Per-(puzzle, framework) breakdown for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkBreakdown {
    pub framework: String,
    /// Statuses in run order.
    pub statuses: Vec<EvalStatus>,
    /// Pass rate over attempted runs, NotAvailable excluded. `None` when
    /// every run was NotAvailable.
    pub pass_rate: Option<f64>,
}

/// All framework breakdowns for one puzzle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleBreakdown {
    pub puzzle: String,
    pub frameworks: Vec<FrameworkBreakdown>,
}

impl EvaluationSummary {
    /// Wraps a result list; `total_runs` is derived from its length.
    pub fn new(results: Vec<EvaluationResult>, timestamp: DateTime<Utc>) -> Self {
        let total_runs = results.len();
        Self {
            results,
            total_runs,
            timestamp,
        }
    }

    fn count(&self, status: EvalStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Number of passing runs.
    pub fn passed(&self) -> usize {
        self.count(EvalStatus::Pass)
    }

    /// Number of failing runs.
    pub fn failed(&self) -> usize {
        self.count(EvalStatus::Fail)
    }

    /// Number of configuration-gap runs.
    pub fn not_available(&self) -> usize {
        self.count(EvalStatus::NotAvailable)
    }

    /// Pass percentage over attempted runs (NotAvailable excluded from both
    /// numerator and denominator); 0 when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        rate(self.passed(), self.failed()).unwrap_or(0.0)
    }

    /// Mean wall-clock seconds across all results; 0 for an empty list.
    pub fn avg_execution_time(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let total: f64 = self.results.iter().map(|r| r.execution_time).sum();
        total / self.results.len() as f64
    }

    /// Groups results by puzzle, then by framework within each puzzle, both
    /// in first-appearance order. Each group carries its ordered per-run
    /// statuses and a pass rate with the same NotAvailable exclusion.
    pub fn group_by_puzzle(&self) -> Vec<PuzzleBreakdown> {
        let mut puzzles: Vec<PuzzleBreakdown> = Vec::new();
        for result in &self.results {
            let puzzle = match puzzles.iter_mut().find(|p| p.puzzle == result.puzzle) {
                Some(existing) => existing,
                None => {
                    puzzles.push(PuzzleBreakdown {
                        puzzle: result.puzzle.clone(),
                        frameworks: Vec::new(),
                    });
                    puzzles.last_mut().expect("just pushed")
                }
            };
            let group = match puzzle
                .frameworks
                .iter_mut()
                .find(|f| f.framework == result.framework)
            {
                Some(existing) => existing,
                None => {
                    puzzle.frameworks.push(FrameworkBreakdown {
                        framework: result.framework.clone(),
                        statuses: Vec::new(),
                        pass_rate: None,
                    });
                    puzzle.frameworks.last_mut().expect("just pushed")
                }
            };
            group.statuses.push(result.status);
        }

        for puzzle in &mut puzzles {
            for group in &mut puzzle.frameworks {
                let passes = group
                    .statuses
                    .iter()
                    .filter(|s| **s == EvalStatus::Pass)
                    .count();
                let fails = group
                    .statuses
                    .iter()
                    .filter(|s| **s == EvalStatus::Fail)
                    .count();
                group.pass_rate = rate(passes, fails);
            }
        }
        puzzles
    }
}

/// Pass percentage over attempted runs; `None` when nothing was attempted.
fn rate(passes: usize, fails: usize) -> Option<f64> {
    let attempted = passes + fails;
    if attempted == 0 {
        None
    } else {
        Some(passes as f64 / attempted as f64 * 100.0)
    }
}
