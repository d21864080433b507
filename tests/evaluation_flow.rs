//! End-to-end tests for the evaluation matrix.
//!
//! These tests drive the full pipeline (config -> matrix -> executor ->
//! summary -> reports) against the scripted framework, so no network or
//! model endpoint is needed.

use std::sync::Arc;
use std::time::Duration;

use agent_gym::cache::CallCache;
use agent_gym::config::{CombinationGroup, EvalConfig, ModelDescriptor};
use agent_gym::frameworks::{default_registry, SCRIPTED};
use agent_gym::puzzles::{SharedPuzzles, FRUIT_COUNT, TOWERS_OF_HANOI};
use agent_gym::report::save_reports;
use agent_gym::runner::{CellExecutor, EvalStatus, MatrixRunner};
use tempfile::TempDir;

fn scripted_config() -> EvalConfig {
    EvalConfig::new()
        .with_puzzles(vec![FRUIT_COUNT.to_string(), TOWERS_OF_HANOI.to_string()])
        .with_group(CombinationGroup {
            frameworks: vec![SCRIPTED.to_string()],
            models: vec![ModelDescriptor::from("test-model")],
        })
        .with_num_runs(2)
        .with_timeout_secs(30)
}

fn build_runner(config: EvalConfig, cache: Option<Arc<CallCache>>) -> MatrixRunner {
    let puzzles = Arc::new(SharedPuzzles::new());
    let registry = Arc::new(default_registry(puzzles.clone()));
    let mut executor = CellExecutor::new(registry, puzzles, Duration::from_secs(30));
    if let Some(cache) = cache {
        executor = executor.with_cache(cache);
    }
    MatrixRunner::new(config, executor)
}

#[tokio::test]
async fn test_scripted_matrix_passes_every_cell() {
    let runner = build_runner(scripted_config(), None);
    let summary = runner.run_all().await;

    // 2 puzzles * 1 framework * 1 model * 2 runs
    assert_eq!(summary.total_runs, 4);
    assert_eq!(summary.passed(), 4);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.not_available(), 0);
    assert_eq!(summary.success_rate(), 100.0);

    // Hanoi runs share one board; both passing shows the executor resets
    // state between cells.
    let hanoi: Vec<_> = summary
        .results
        .iter()
        .filter(|r| r.puzzle == TOWERS_OF_HANOI)
        .collect();
    assert_eq!(hanoi.len(), 2);
    assert!(hanoi.iter().all(|r| r.status == EvalStatus::Pass));
}

#[tokio::test]
async fn test_unregistered_framework_reports_not_available() {
    let config = EvalConfig::new()
        .with_puzzles(vec![FRUIT_COUNT.to_string()])
        .with_group(CombinationGroup {
            frameworks: vec![SCRIPTED.to_string(), "strands".to_string()],
            models: vec![ModelDescriptor::from("test-model")],
        })
        .with_num_runs(1);
    let runner = build_runner(config, None);
    let summary = runner.run_all().await;

    assert_eq!(summary.total_runs, 2);
    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.not_available(), 1);
    // Unattempted cells never drag the rate down
    assert_eq!(summary.success_rate(), 100.0);

    let missing = &summary.results[1];
    assert_eq!(missing.framework, "strands");
    assert_eq!(missing.status, EvalStatus::NotAvailable);
    assert_eq!(
        missing.error_message.as_deref(),
        Some("No implementation for fruit_count puzzle")
    );
}

#[tokio::test]
async fn test_result_order_matches_expansion_order() {
    let runner = build_runner(scripted_config(), None);
    let expected: Vec<String> = runner.cells().map(|c| c.to_string()).collect();
    let summary = runner.run_all().await;
    let actual: Vec<String> = summary
        .results
        .iter()
        .map(|r| {
            format!(
                "{}/{}/{}/run_{}",
                r.puzzle, r.framework, r.model, r.run_number
            )
        })
        .collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_reports_written_from_live_summary() {
    let runner = build_runner(scripted_config(), None);
    let summary = runner.run_all().await;

    let dir = TempDir::new().unwrap();
    let paths = save_reports(&summary, dir.path()).unwrap();
    assert_eq!(paths.len(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
    assert_eq!(json["total_runs"], 4);
    assert_eq!(json["passed"], 4);
    assert_eq!(json["success_rate"], 100.0);

    let md = std::fs::read_to_string(&paths[1]).unwrap();
    assert!(md.contains("# AgentGym Evaluation Results"));
    assert!(md.contains("| towers_of_hanoi | scripted | test-model | 2 | Pass |"));
}

#[tokio::test]
async fn test_cache_persists_across_runners() {
    let cache_dir = TempDir::new().unwrap();

    let cache = Arc::new(CallCache::new(cache_dir.path()).unwrap());
    let first = build_runner(scripted_config(), Some(cache)).run_all().await;
    assert_eq!(first.passed(), 4);

    // A fresh runner over the same cache directory replays stored outcomes.
    let cache = Arc::new(CallCache::new(cache_dir.path()).unwrap());
    let second = build_runner(scripted_config(), Some(cache)).run_all().await;
    assert_eq!(second.passed(), 4);

    let entries = std::fs::read_dir(cache_dir.path()).unwrap().count();
    // One entry per distinct (framework, puzzle, model) call; run repeats
    // and the second pass hit the same keys.
    assert_eq!(entries, 2);
}
