//! Command-line interface for agent-gym.
//!
//! Provides commands for running the evaluation matrix and inspecting the
//! planned cell expansion without executing anything.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
