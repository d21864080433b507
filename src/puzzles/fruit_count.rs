//! Fruit counting puzzle: inventory tools and result checker.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::coerce_object;
use crate::error::CheckError;
use crate::registry::Checker;

/// Fixed fruit inventory queried by the counting tools.
#[derive(Debug, Clone)]
pub struct FruitInventory {
    counts: BTreeMap<String, u32>,
}

impl FruitInventory {
    /// Canonical inventory: 25 oranges, 30 apples.
    pub fn new() -> Self {
        let mut counts = BTreeMap::new();
        counts.insert("orange".to_string(), 25);
        counts.insert("apple".to_string(), 30);
        Self { counts }
    }

    pub fn oranges(&self) -> u32 {
        self.counts["orange"]
    }

    pub fn apples(&self) -> u32 {
        self.counts["apple"]
    }
}

impl Default for FruitInventory {
    fn default() -> Self {
        Self::new()
    }
}

/// Expected answer shape from the fruit counting agent.
#[derive(Debug, Deserialize)]
struct FruitCountResponse {
    fruit_count_by_color: BTreeMap<String, i64>,
}

/// Validates the agent's fruit counts against the canonical inventory.
pub struct FruitCountChecker;

impl Checker for FruitCountChecker {
    fn check(&self, result: &Value) -> Result<(), CheckError> {
        tracing::debug!(%result, "checking fruit count result");
        let object = coerce_object(result)?;
        let response: FruitCountResponse = serde_json::from_value(object)
            .map_err(|e| CheckError::new(format!("Invalid agent output: {e}")))?;

        let mut expected = BTreeMap::new();
        expected.insert("orange".to_string(), 25_i64);
        expected.insert("apple".to_string(), 30_i64);

        if response.fruit_count_by_color != expected {
            return Err(CheckError::new(format!(
                "fruit_count_by_color must match {expected:?}, got: {:?}",
                response.fruit_count_by_color
            )));
        }
        Ok(())
    }
}
