//! Deterministic in-process solver framework.
//!
//! Solves each puzzle by driving its tools directly, with no model endpoint
//! involved. Useful as a smoke-test framework and as the workhorse for
//! integration tests: it exercises the same tool surface a model-backed
//! framework would, with a known-good move sequence.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::ModelDescriptor;
use crate::error::AgentError;
use crate::puzzles::SharedPuzzles;
use crate::registry::{AgentOutcome, AgentRunner};

enum Task {
    FruitCount,
    TowersOfHanoi,
}

/// Scripted solver for one puzzle. Accepts any model descriptor shape; the
/// descriptor is ignored beyond logging.
pub struct ScriptedAgent {
    task: Task,
    puzzles: Arc<SharedPuzzles>,
}

impl ScriptedAgent {
    /// Scripted fruit counting solver.
    pub fn fruit_count(puzzles: Arc<SharedPuzzles>) -> Self {
        Self {
            task: Task::FruitCount,
            puzzles,
        }
    }

    /// Scripted Towers of Hanoi solver (optimal 7-move solution).
    pub fn towers_of_hanoi(puzzles: Arc<SharedPuzzles>) -> Self {
        Self {
            task: Task::TowersOfHanoi,
            puzzles,
        }
    }

    async fn solve_fruit_count(&self) -> AgentOutcome {
        let oranges = self.puzzles.count_of_oranges().await;
        let apples = self.puzzles.count_of_apples().await;
        AgentOutcome::new(json!({
            "fruit_count_by_color": { "orange": oranges, "apple": apples }
        }))
    }

    async fn solve_towers_of_hanoi(&self) -> AgentOutcome {
        let solution = [
            ("A", "C"),
            ("A", "B"),
            ("C", "B"),
            ("A", "C"),
            ("B", "A"),
            ("B", "C"),
            ("A", "C"),
        ];

        let mut moves = Vec::new();
        for (from, to) in solution {
            let reply = self.puzzles.move_disk(from, to).await;
            if reply.success {
                moves.push(json!({ "from": from, "to": to }));
            } else {
                tracing::warn!(from, to, message = %reply.message, "scripted move rejected");
            }
        }

        let solved = self.puzzles.check_if_solved().await;
        let final_state = self.puzzles.tower_state().await;
        AgentOutcome::new(json!({
            "moves": moves,
            "solved": solved.solved,
            "final_state": final_state,
        }))
    }
}

#[async_trait]
impl AgentRunner for ScriptedAgent {
    async fn run(&self, model: &ModelDescriptor) -> Result<AgentOutcome, AgentError> {
        tracing::debug!(model = model.display_name(), "running scripted agent");
        let outcome = match self.task {
            Task::FruitCount => self.solve_fruit_count().await,
            Task::TowersOfHanoi => self.solve_towers_of_hanoi().await,
        };
        Ok(outcome)
    }
}
