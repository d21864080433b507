//! Matrix expansion and the sequential evaluation loop.
//!
//! The expansion order is a contract: puzzles in configured order, then
//! combination groups, then frameworks, then models, then run numbers
//! `1..=N`. Re-running the same configuration reproduces the same cell
//! sequence, and the result list always matches it — the runner drives
//! cells strictly one at a time because the puzzle tool layer holds
//! process-wide mutable state with no per-cell isolation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, Instrument};

use crate::config::EvalConfig;

use super::executor::CellExecutor;
use super::result::EvaluationCell;
use super::summary::EvaluationSummary;

/// Drives the full evaluation matrix.
pub struct MatrixRunner {
    config: EvalConfig,
    executor: CellExecutor,
    cancelled: Arc<AtomicBool>,
}

impl MatrixRunner {
    /// Creates a runner over a validated configuration.
    pub fn new(config: EvalConfig, executor: CellExecutor) -> Self {
        Self {
            config,
            executor,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the runner from launching new cells when set.
    /// Already-collected results are still summarized.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Total number of cells the matrix will produce:
    /// Σ over puzzles, groups of |frameworks| × |models| × N.
    pub fn total_cells(&self) -> usize {
        let per_puzzle: usize = self
            .config
            .combinations
            .iter()
            .map(|group| group.frameworks.len() * group.models.len())
            .sum();
        self.config.puzzles.len() * per_puzzle * self.config.num_runs as usize
    }

    /// Lazily yields cells in the contractual expansion order. The matrix is
    /// never materialized as one list.
    pub fn cells(&self) -> impl Iterator<Item = EvaluationCell> + '_ {
        let num_runs = self.config.num_runs;
        self.config.puzzles.iter().flat_map(move |puzzle| {
            self.config.combinations.iter().flat_map(move |group| {
                group.frameworks.iter().flat_map(move |framework| {
                    group.models.iter().flat_map(move |model| {
                        (1..=num_runs).map(move |run_number| EvaluationCell {
                            puzzle: puzzle.clone(),
                            framework: framework.clone(),
                            model: model.clone(),
                            run_number,
                        })
                    })
                })
            })
        })
    }

    /// Runs every cell sequentially and aggregates the outcomes.
    ///
    /// No cell failure can abort the matrix: the executor never fails. An
    /// external cancellation (via [`MatrixRunner::cancel_flag`]) stops the
    /// loop between cells; partial results are still returned.
    pub async fn run_all(&self) -> EvaluationSummary {
        let total = self.total_cells();
        info!("starting evaluation run");
        info!("  puzzles: {:?}", self.config.puzzles);
        info!(
            "  framework-model combinations: {}",
            self.config.combinations.len()
        );
        info!("  total evaluations: {total}");

        let mut results = Vec::new();
        for (index, cell) in self.cells().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                tracing::warn!(
                    completed = results.len(),
                    total,
                    "run cancelled, summarizing partial results"
                );
                break;
            }
            info!("progress: {}/{total}", index + 1);
            let span = info_span!(
                "evaluation_cell",
                puzzle = %cell.puzzle,
                framework = %cell.framework,
                model = %cell.model.display_name(),
                run = cell.run_number
            );
            let result = self.executor.execute(&cell).instrument(span).await;
            results.push(result);
        }

        EvaluationSummary::new(results, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CombinationGroup, ModelDescriptor};
    use crate::frameworks::{default_registry, SCRIPTED};
    use crate::puzzles::SharedPuzzles;
    use crate::runner::result::EvalStatus;
    use std::time::Duration;

    fn runner_for(config: EvalConfig) -> MatrixRunner {
        let puzzles = Arc::new(SharedPuzzles::new());
        let executor = CellExecutor::new(
            Arc::new(default_registry(puzzles.clone())),
            puzzles,
            Duration::from_secs(5),
        );
        MatrixRunner::new(config, executor)
    }

    fn two_framework_config() -> EvalConfig {
        EvalConfig::new()
            .with_puzzles(vec!["P1".to_string(), "P2".to_string()])
            .with_group(CombinationGroup {
                frameworks: vec!["F1".to_string(), "F2".to_string()],
                models: vec![ModelDescriptor::from("M1")],
            })
            .with_num_runs(2)
    }

    #[test]
    fn test_expansion_order_contract() {
        let runner = runner_for(two_framework_config());
        let sequence: Vec<(String, String, u32)> = runner
            .cells()
            .map(|c| (c.puzzle, c.framework, c.run_number))
            .collect();

        let expected: Vec<(String, String, u32)> = [
            ("P1", "F1", 1),
            ("P1", "F1", 2),
            ("P1", "F2", 1),
            ("P1", "F2", 2),
            ("P2", "F1", 1),
            ("P2", "F1", 2),
            ("P2", "F2", 1),
            ("P2", "F2", 2),
        ]
        .iter()
        .map(|(p, f, r)| (p.to_string(), f.to_string(), *r))
        .collect();

        assert_eq!(sequence, expected);
    }

    #[test]
    fn test_total_cells_matches_formula() {
        let config = EvalConfig::new()
            .with_puzzles(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .with_group(CombinationGroup {
                frameworks: vec!["f1".to_string(), "f2".to_string()],
                models: vec![ModelDescriptor::from("m1"), ModelDescriptor::from("m2")],
            })
            .with_group(CombinationGroup {
                frameworks: vec!["f3".to_string()],
                models: vec![ModelDescriptor::from("m3")],
            })
            .with_num_runs(3);
        let runner = runner_for(config);
        // 3 puzzles * (2*2 + 1*1) * 3 runs
        assert_eq!(runner.total_cells(), 45);
        assert_eq!(runner.cells().count(), 45);
    }

    #[tokio::test]
    async fn test_run_all_result_order_and_counts() {
        let config = EvalConfig::new()
            .with_puzzles(vec!["fruit_count".to_string(), "towers_of_hanoi".to_string()])
            .with_group(CombinationGroup {
                frameworks: vec![SCRIPTED.to_string(), "missing_framework".to_string()],
                models: vec![ModelDescriptor::from("m")],
            })
            .with_num_runs(2);
        let runner = runner_for(config);

        let summary = runner.run_all().await;
        assert_eq!(summary.total_runs, 8);
        assert_eq!(summary.passed(), 4);
        assert_eq!(summary.not_available(), 4);

        // Result order mirrors expansion order
        let expected: Vec<(String, String, u32)> = runner
            .cells()
            .map(|c| (c.puzzle, c.framework, c.run_number))
            .collect();
        let actual: Vec<(String, String, u32)> = summary
            .results
            .iter()
            .map(|r| (r.puzzle.clone(), r.framework.clone(), r.run_number))
            .collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_partial_results() {
        let runner = runner_for(two_framework_config());
        // Cancel before starting: no cells launch, summary still produced.
        runner.cancel_flag().store(true, Ordering::SeqCst);
        let summary = runner.run_all().await;
        assert_eq!(summary.total_runs, 0);
        assert_eq!(summary.results.len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_puzzle_fails_but_does_not_abort() {
        let config = EvalConfig::new()
            .with_puzzles(vec!["no_such_puzzle".to_string(), "fruit_count".to_string()])
            .with_group(CombinationGroup {
                frameworks: vec![SCRIPTED.to_string()],
                models: vec![ModelDescriptor::from("m")],
            })
            .with_num_runs(1);
        let runner = runner_for(config);
        let summary = runner.run_all().await;
        assert_eq!(summary.total_runs, 2);
        assert_eq!(summary.results[0].status, EvalStatus::Fail);
        assert_eq!(summary.results[1].status, EvalStatus::Pass);
    }
}
