//! Run Configuration
//!
//! Everything a run needs besides the topology, the agents and the utility
//! model. Partial serialized configs fall back to the defaults.

use serde::{Deserialize, Serialize};

use crate::moves::{EvaluationMode, MoveRule};

/// Default iteration cap
pub const DEFAULT_MAX_ITERATIONS: u64 = 200;

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub rule: MoveRule,
    pub max_iterations: u64,
    pub seed: u64,
    /// Moves applied per iteration; each iteration records one snapshot.
    /// Zero behaves as one.
    pub moves_per_iteration: usize,
    pub evaluation: EvaluationMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rule: MoveRule::Jump,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
            moves_per_iteration: 1,
            evaluation: EvaluationMode::Parallel,
        }
    }
}

impl RunConfig {
    pub fn new(rule: MoveRule, max_iterations: u64, seed: u64) -> Self {
        Self {
            rule,
            max_iterations,
            seed,
            ..Self::default()
        }
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationMode) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_moves_per_iteration(mut self, moves: usize) -> Self {
        self.moves_per_iteration = moves;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"rule": "max_swap", "seed": 9}"#).unwrap();
        assert_eq!(config.rule, MoveRule::MaxSwap);
        assert_eq!(config.seed, 9);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.moves_per_iteration, 1);
        assert_eq!(config.evaluation, EvaluationMode::Parallel);
    }
}
