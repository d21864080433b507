//! Puzzle tasks: deterministic in-memory state machines plus their checkers.
//!
//! Each puzzle contributes two things: a small set of named tool operations
//! the agent frameworks call while solving, and a [`Checker`] that validates
//! the agent's final answer. The Towers of Hanoi board is mutable and
//! process-wide, so it lives behind [`SharedPuzzles`], which owns the reset
//! contract: the cell executor resets the relevant puzzle before every agent
//! invocation so a prior cell's leftover state cannot leak into the next.

pub mod fruit_count;
pub mod towers_of_hanoi;

use std::sync::Mutex;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CheckError;
pub use fruit_count::{FruitCountChecker, FruitInventory};
pub use towers_of_hanoi::{HanoiBoard, TowersOfHanoiChecker};

/// Puzzle identifier for the fruit counting task.
pub const FRUIT_COUNT: &str = "fruit_count";
/// Puzzle identifier for the Towers of Hanoi task.
pub const TOWERS_OF_HANOI: &str = "towers_of_hanoi";

/// Simulated latency for tool calls, the only suspension point in the stubs.
const TOOL_LATENCY: Duration = Duration::from_millis(10);

/// Outcome of a state-transition tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReply {
    /// Whether the transition was applied.
    pub success: bool,
    /// Human-readable explanation, surfaced to the agent.
    pub message: String,
}

impl ToolReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Reply from the terminal-condition tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolvedReply {
    /// Whether the puzzle is in its solved configuration.
    pub solved: bool,
    /// Human-readable status message.
    pub message: String,
}

/// Process-wide puzzle state with an explicit, testable reset contract.
///
/// Exactly one cell is live at a time (the runner is strictly sequential),
/// so a plain mutex suffices; the lock is never held across an await.
pub struct SharedPuzzles {
    hanoi: Mutex<HanoiBoard>,
    fruit: FruitInventory,
}

impl SharedPuzzles {
    /// Creates puzzle state in canonical initial configuration.
    pub fn new() -> Self {
        Self {
            hanoi: Mutex::new(HanoiBoard::new()),
            fruit: FruitInventory::new(),
        }
    }

    /// Resets the named puzzle to its canonical initial configuration.
    ///
    /// Called by the cell executor before each agent invocation. Puzzles
    /// without mutable state (fruit counting) reset to a no-op; unknown
    /// puzzle names are ignored — the registry already gates which puzzles
    /// can run.
    pub fn reset(&self, puzzle: &str) {
        if puzzle == TOWERS_OF_HANOI {
            self.hanoi.lock().expect("hanoi lock poisoned").reset();
            tracing::debug!("towers reset to initial state");
        }
    }

    // --- Fruit counting tools ---

    /// Current count of oranges in inventory.
    pub async fn count_of_oranges(&self) -> u32 {
        tokio::time::sleep(TOOL_LATENCY).await;
        self.fruit.oranges()
    }

    /// Current count of apples in inventory.
    pub async fn count_of_apples(&self) -> u32 {
        tokio::time::sleep(TOOL_LATENCY).await;
        self.fruit.apples()
    }

    // --- Towers of Hanoi tools ---

    /// Snapshot of all towers, bottom (largest) to top (smallest).
    pub async fn tower_state(&self) -> std::collections::BTreeMap<String, Vec<u8>> {
        tokio::time::sleep(TOOL_LATENCY).await;
        self.hanoi.lock().expect("hanoi lock poisoned").state()
    }

    /// Tower (column) names, e.g. `["A", "B", "C"]`.
    pub async fn column_names(&self) -> Vec<String> {
        tokio::time::sleep(TOOL_LATENCY).await;
        self.hanoi
            .lock()
            .expect("hanoi lock poisoned")
            .column_names()
    }

    /// Attempts to move the top disk between towers.
    pub async fn move_disk(&self, from: &str, to: &str) -> ToolReply {
        tokio::time::sleep(TOOL_LATENCY).await;
        self.hanoi
            .lock()
            .expect("hanoi lock poisoned")
            .move_disk(from, to)
    }

    /// Checks the terminal condition.
    pub async fn check_if_solved(&self) -> SolvedReply {
        tokio::time::sleep(TOOL_LATENCY).await;
        let board = self.hanoi.lock().expect("hanoi lock poisoned");
        if board.is_solved() {
            SolvedReply {
                solved: true,
                message: "Congratulations! Puzzle solved.".to_string(),
            }
        } else {
            SolvedReply {
                solved: false,
                message: "Puzzle not yet solved.".to_string(),
            }
        }
    }
}

impl Default for SharedPuzzles {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort scan for a JSON object embedded in free text.
///
/// Greedy brace match across lines, then a parse attempt. Returns `None`
/// when no braces are found or the match is not valid JSON.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let pattern = Regex::new(r"(?s)\{.*\}").expect("static regex");
    let matched = pattern.find(text)?;
    serde_json::from_str(matched.as_str()).ok()
}

/// Coerces a checker input into a JSON object.
///
/// Accepts objects directly; for strings (or anything else) falls back to
/// the embedded-JSON scan before giving up.
pub(crate) fn coerce_object(result: &Value) -> Result<Value, CheckError> {
    if result.is_object() {
        return Ok(result.clone());
    }
    let text = match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    extract_json_object(&text)
        .ok_or_else(|| CheckError::new(format!("Could not parse response: {text}")))
}
