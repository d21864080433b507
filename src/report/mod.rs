//! Report persistence and console summary.
//!
//! Writes the evaluation summary to the reports directory in two forms: a
//! JSON document with overall statistics and the full per-cell result
//! table, and a Markdown rendering of the same data for humans.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::error::ReportError;
use crate::runner::{EvalStatus, EvaluationSummary};

/// Writes the JSON and Markdown reports, returning their paths.
pub fn save_reports(
    summary: &EvaluationSummary,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| ReportError::DirectoryCreation {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let json_path = dir.join("evaluation_summary.json");
    let document = json!({
        "timestamp": summary.timestamp,
        "total_runs": summary.total_runs,
        "passed": summary.passed(),
        "failed": summary.failed(),
        "not_available": summary.not_available(),
        "success_rate": summary.success_rate(),
        "avg_execution_time": summary.avg_execution_time(),
        "results": summary.results,
    });
    std::fs::write(&json_path, serde_json::to_string_pretty(&document)?)?;

    let md_path = dir.join("evaluation_summary.md");
    std::fs::write(&md_path, render_markdown(summary))?;

    info!("reports saved to {}", dir.display());
    Ok(vec![json_path, md_path])
}

/// Renders the summary as a Markdown document.
fn render_markdown(summary: &EvaluationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# AgentGym Evaluation Results");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", summary.timestamp.to_rfc3339());
    let _ = writeln!(out);
    let _ = writeln!(out, "## Overall Statistics");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Total runs: {}", summary.total_runs);
    let _ = writeln!(out, "- Passed: {}", summary.passed());
    let _ = writeln!(out, "- Failed: {}", summary.failed());
    let _ = writeln!(out, "- Not Available: {}", summary.not_available());
    let _ = writeln!(
        out,
        "- Success rate: {:.1}% (excluding not available)",
        summary.success_rate()
    );
    let _ = writeln!(
        out,
        "- Average execution time: {:.2}s",
        summary.avg_execution_time()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "## Results");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "| Puzzle | Framework | Model | Run | Status | Time (s) | Prompt tokens | Completion tokens | Error |"
    );
    let _ = writeln!(out, "|---|---|---|---|---|---|---|---|---|");
    for r in &summary.results {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {:.2} | {} | {} | {} |",
            r.puzzle,
            r.framework,
            r.model,
            r.run_number,
            r.status,
            r.execution_time,
            r.prompt_tokens.map_or(String::from("-"), |t| t.to_string()),
            r.completion_tokens
                .map_or(String::from("-"), |t| t.to_string()),
            r.error_message.as_deref().unwrap_or("-").replace('|', "\\|"),
        );
    }
    out
}

/// Prints the evaluation summary to stdout.
pub fn print_summary(summary: &EvaluationSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("AGENTGYM EVALUATION RESULTS");
    println!("{}", "=".repeat(80));
    println!("Overall Statistics:");
    println!("   Total runs: {}", summary.total_runs);
    println!("   Passed: {}", summary.passed());
    println!("   Failed: {}", summary.failed());
    println!("   Not Available: {}", summary.not_available());
    println!(
        "   Success rate: {:.1}% (excluding not available)",
        summary.success_rate()
    );

    for puzzle in summary.group_by_puzzle() {
        println!();
        println!("{}:", puzzle.puzzle.to_uppercase());
        for group in &puzzle.frameworks {
            let statuses: Vec<&str> = group
                .statuses
                .iter()
                .map(|s| match s {
                    EvalStatus::Pass => "PASS",
                    EvalStatus::Fail => "FAIL",
                    EvalStatus::NotAvailable => "N/A",
                })
                .collect();
            let rate = group
                .pass_rate
                .map_or(String::from("N/A"), |r| format!("{r:.0}%"));
            println!(
                "   {:20} [{}] ({rate})",
                group.framework,
                statuses.join(" | ")
            );
        }
    }
}
