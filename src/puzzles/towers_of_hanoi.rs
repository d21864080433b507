//! Towers of Hanoi puzzle: board state machine and result checker.
//!
//! Three towers A, B, C; tower A starts with disks `[3, 2, 1]` (bottom to
//! top). The solved configuration is all disks on tower C.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{coerce_object, ToolReply};
use crate::error::CheckError;
use crate::registry::Checker;

/// The solved configuration of tower C.
const SOLVED_TOWER: [u8; 3] = [3, 2, 1];

/// Mutable Hanoi board. Disk numbers are sizes; larger numbers are larger
/// disks, and a disk may only rest on a larger one.
#[derive(Debug, Clone)]
pub struct HanoiBoard {
    towers: BTreeMap<String, Vec<u8>>,
}

impl HanoiBoard {
    /// A board in canonical initial configuration.
    pub fn new() -> Self {
        let mut towers = BTreeMap::new();
        towers.insert("A".to_string(), vec![3, 2, 1]);
        towers.insert("B".to_string(), Vec::new());
        towers.insert("C".to_string(), Vec::new());
        Self { towers }
    }

    /// Restores the canonical initial configuration.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Snapshot of all towers.
    pub fn state(&self) -> BTreeMap<String, Vec<u8>> {
        self.towers.clone()
    }

    /// Tower names in display order.
    pub fn column_names(&self) -> Vec<String> {
        self.towers.keys().cloned().collect()
    }

    /// True when all disks sit on tower C.
    pub fn is_solved(&self) -> bool {
        self.towers["C"] == SOLVED_TOWER
    }

    /// Attempts to move the top disk of `from` onto `to`.
    pub fn move_disk(&mut self, from: &str, to: &str) -> ToolReply {
        if !self.towers.contains_key(from) || !self.towers.contains_key(to) {
            return ToolReply::rejected("Invalid tower names.");
        }
        if from == to {
            return ToolReply::rejected("Cannot move disk to the same tower");
        }
        let Some(&disk) = self.towers[from].last() else {
            return ToolReply::rejected(format!("Tower {from} is empty"));
        };
        if let Some(&top) = self.towers[to].last() {
            if disk > top {
                return ToolReply::rejected(
                    "Invalid move: cannot place larger disk on smaller disk",
                );
            }
        }
        self.towers.get_mut(from).expect("validated above").pop();
        self.towers.get_mut(to).expect("validated above").push(disk);
        tracing::debug!(disk, from, to, "moved disk");
        ToolReply::ok(format!("Successfully moved disk from {from} to {to}"))
    }
}

impl Default for HanoiBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// A single move in the agent's reported solution.
#[derive(Debug, Deserialize)]
struct ReportedMove {
    #[serde(rename = "from")]
    from_tower: String,
    #[serde(rename = "to")]
    to_tower: String,
}

/// Expected answer shape from the Towers of Hanoi agent.
#[derive(Debug, Deserialize)]
struct TowersOfHanoiResponse {
    moves: Vec<ReportedMove>,
    solved: bool,
    final_state: BTreeMap<String, Vec<u8>>,
}

/// Validates the agent's reported solution.
pub struct TowersOfHanoiChecker;

impl Checker for TowersOfHanoiChecker {
    fn check(&self, result: &Value) -> Result<(), CheckError> {
        tracing::debug!(%result, "checking towers of hanoi result");
        let object = coerce_object(result)?;
        let response: TowersOfHanoiResponse = serde_json::from_value(object)
            .map_err(|e| CheckError::new(format!("Invalid agent output: {e}")))?;

        if !response.solved {
            return Err(CheckError::new("Puzzle was not solved"));
        }

        let tower_c = response.final_state.get("C");
        if tower_c.map(Vec::as_slice) != Some(SOLVED_TOWER.as_slice()) {
            return Err(CheckError::new(format!(
                "Final state incorrect. Tower C should have {SOLVED_TOWER:?}, got {tower_c:?}"
            )));
        }

        let tower_a = response.final_state.get("A");
        let tower_b = response.final_state.get("B");
        if tower_a.map(|t| !t.is_empty()).unwrap_or(true)
            || tower_b.map(|t| !t.is_empty()).unwrap_or(true)
        {
            return Err(CheckError::new(format!(
                "Towers A and B should be empty. Got A: {tower_a:?}, B: {tower_b:?}"
            )));
        }

        // 3 disks need at least 7 moves; fewer is suspicious but not fatal.
        if response.moves.len() < 7 {
            tracing::warn!(
                moves = response.moves.len(),
                "suspiciously few moves, minimum is 7 for 3 disks"
            );
        }

        for (i, mv) in response.moves.iter().enumerate() {
            let valid = |t: &str| matches!(t, "A" | "B" | "C");
            if !valid(&mv.from_tower) || !valid(&mv.to_tower) {
                return Err(CheckError::new(format!(
                    "Move {} has invalid tower names: {} -> {}",
                    i + 1,
                    mv.from_tower,
                    mv.to_tower
                )));
            }
        }
        Ok(())
    }
}
