//! Run Statistics
//!
//! Summary figures computed once a run ends.

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// Overall run statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Iteration index of the final snapshot
    pub iterations: u64,
    pub jumps: usize,
    pub swaps: usize,
    pub initial_mean_utility: f64,
    pub final_mean_utility: f64,
    /// Share of agents at or above their happiness threshold at the end
    pub final_happy_fraction: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unhappy_agents: Vec<AgentId>,
}

impl RunStats {
    pub fn total_moves(&self) -> usize {
        self.jumps + self.swaps
    }
}
