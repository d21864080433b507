//! Agent-framework adapters.
//!
//! Each adapter implements [`AgentRunner`](crate::registry::AgentRunner) for
//! one (framework, puzzle) pair: it builds a framework-specific client,
//! drives the puzzle tools, and returns an [`AgentOutcome`]. Two frameworks
//! ship with the crate:
//!
//! - `openai_http`: raw chat-completions calls against an OpenAI-compatible
//!   custom endpoint, with a tool-calling loop. Endpoint descriptors only.
//! - `scripted`: a deterministic in-process solver that exercises the puzzle
//!   tools without any model endpoint; accepts every model shape. Used for
//!   smoke runs and tests.

pub mod openai_http;
pub mod scripted;

use std::sync::Arc;

use crate::puzzles::{
    FruitCountChecker, SharedPuzzles, TowersOfHanoiChecker, FRUIT_COUNT, TOWERS_OF_HANOI,
};
use crate::registry::EvalRegistry;

pub use openai_http::OpenAiHttpAgent;
pub use scripted::ScriptedAgent;

/// Framework identifier for the raw OpenAI-compatible HTTP adapter.
pub const OPENAI_HTTP: &str = "openai_http";
/// Framework identifier for the deterministic in-process solver.
pub const SCRIPTED: &str = "scripted";

/// Wires the built-in checkers and frameworks into a registry.
///
/// Both built-in frameworks implement both puzzles; configurations naming
/// other frameworks simply miss the lookup and evaluate as NotAvailable.
pub fn default_registry(puzzles: Arc<SharedPuzzles>) -> EvalRegistry {
    EvalRegistry::new()
        .with_checker(FRUIT_COUNT, Arc::new(FruitCountChecker))
        .with_checker(TOWERS_OF_HANOI, Arc::new(TowersOfHanoiChecker))
        .with_agent(
            OPENAI_HTTP,
            FRUIT_COUNT,
            Arc::new(OpenAiHttpAgent::fruit_count(puzzles.clone())),
        )
        .with_agent(
            OPENAI_HTTP,
            TOWERS_OF_HANOI,
            Arc::new(OpenAiHttpAgent::towers_of_hanoi(puzzles.clone())),
        )
        .with_agent(
            SCRIPTED,
            FRUIT_COUNT,
            Arc::new(ScriptedAgent::fruit_count(puzzles.clone())),
        )
        .with_agent(
            SCRIPTED,
            TOWERS_OF_HANOI,
            Arc::new(ScriptedAgent::towers_of_hanoi(puzzles)),
        )
}
