//! CLI command definitions for agent-gym.
//!
//! Two commands: `run` executes the configured evaluation matrix and writes
//! reports, `plan` prints the cell expansion without calling any agent.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::cache::CallCache;
use crate::config::EvalConfig;
use crate::frameworks::default_registry;
use crate::puzzles::SharedPuzzles;
use crate::report;
use crate::runner::{CellExecutor, MatrixRunner};

/// Default configuration file path.
const DEFAULT_CONFIG: &str = "eval_config.yaml";

/// Evaluation matrix orchestrator for agent frameworks.
#[derive(Parser)]
#[command(name = "agent-gym")]
#[command(about = "Benchmark agent frameworks and models against puzzle tasks")]
#[command(version)]
#[command(
    long_about = "agent-gym expands a YAML configuration into an evaluation matrix\n(puzzles x frameworks x models x runs), executes each cell against live\nmodel endpoints, and aggregates pass/fail/not-available outcomes into\nJSON and Markdown reports.\n\nExample usage:\n  agent-gym run --config eval_config.yaml --runs 3"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the full evaluation matrix and write reports.
    Run(RunArgs),

    /// Print the planned cell expansion without executing anything.
    Plan(PlanArgs),
}

/// Arguments for `agent-gym run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the YAML evaluation configuration.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Override the number of runs per cell.
    #[arg(short = 'n', long)]
    pub runs: Option<u32>,

    /// Override the per-cell timeout in seconds.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Override the reports output directory.
    #[arg(short, long)]
    pub reports_dir: Option<PathBuf>,

    /// Directory for the agent-call cache. Overrides the configured value;
    /// caching is disabled when neither is set.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Skip writing report files (console summary only).
    #[arg(long)]
    pub no_reports: bool,
}

/// Arguments for `agent-gym plan`.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Path to the YAML evaluation configuration.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Parse CLI arguments without running any command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// This is a convenience function that parses CLI args and runs the command.
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the agent-gym CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            run_run_command(args).await?;
        }
        Commands::Plan(args) => {
            run_plan_command(args)?;
        }
    }
    Ok(())
}

fn load_config(path: &PathBuf) -> anyhow::Result<EvalConfig> {
    let config = EvalConfig::from_yaml_file(path)?;
    config.validate()?;
    Ok(config)
}

async fn run_run_command(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(runs) = args.runs {
        config = config.with_num_runs(runs);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_timeout_secs(timeout);
    }
    if let Some(dir) = args.reports_dir {
        config = config.with_reports_dir(dir);
    }
    if let Some(dir) = args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    config.validate()?;

    let puzzles = Arc::new(SharedPuzzles::new());
    let registry = Arc::new(default_registry(puzzles.clone()));
    let mut executor = CellExecutor::new(registry, puzzles, config.timeout());
    if let Some(cache_dir) = &config.cache_dir {
        info!("agent-call cache enabled at {}", cache_dir.display());
        executor = executor.with_cache(Arc::new(CallCache::new(cache_dir)?));
    }

    let reports_dir = config.reports_dir.clone();
    let runner = MatrixRunner::new(config, executor);

    // First Ctrl-C stops launching new cells; partial results still land
    // in the reports.
    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current cell then stopping");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let summary = runner.run_all().await;

    report::print_summary(&summary);
    if args.no_reports {
        info!("skipping report files (--no-reports)");
    } else {
        let paths = report::save_reports(&summary, &reports_dir)?;
        for path in paths {
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn run_plan_command(args: PlanArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;

    let puzzles = Arc::new(SharedPuzzles::new());
    let registry = Arc::new(default_registry(puzzles.clone()));
    let executor = CellExecutor::new(registry.clone(), puzzles, Duration::from_secs(0));
    let runner = MatrixRunner::new(config, executor);

    println!("Planned evaluation cells ({} total):", runner.total_cells());
    for cell in runner.cells() {
        let note = if registry
            .agent(&cell.framework, &cell.puzzle)
            .is_none()
        {
            "  [not available]"
        } else {
            ""
        };
        println!("  {cell}{note}");
    }
    Ok(())
}
