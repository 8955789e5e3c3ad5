//! Friends/enemies utility over a social graph
//!
//! The social term ignores type vectors. It looks up each neighbor's
//! affinity with the scored agent: positive affinity is a friend, negative
//! an enemy, zero or absent is indifferent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ScoreRange, UtilityContext, UtilityModel};
use crate::components::TypeVector;
use crate::error::UtilityError;
use schelling_events::AgentId;

/// Signed affinities between agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialGraph {
    directed: bool,
    affinities: BTreeMap<AgentId, BTreeMap<AgentId, f64>>,
}

impl SocialGraph {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            affinities: BTreeMap::new(),
        }
    }

    /// Records how `from` feels about `to`; undirected graphs record both ways.
    pub fn relate(&mut self, from: AgentId, to: AgentId, affinity: f64) {
        self.affinities.entry(from).or_default().insert(to, affinity);
        if !self.directed {
            self.affinities.entry(to).or_default().insert(from, affinity);
        }
    }

    pub fn with(mut self, from: AgentId, to: AgentId, affinity: f64) -> Self {
        self.relate(from, to, affinity);
        self
    }

    pub fn affinity(&self, from: AgentId, to: AgentId) -> Option<f64> {
        self.affinities.get(&from).and_then(|row| row.get(&to)).copied()
    }

    pub fn is_friend(&self, from: AgentId, to: AgentId) -> bool {
        self.affinity(from, to).is_some_and(|a| a > 0.0)
    }

    pub fn is_enemy(&self, from: AgentId, to: AgentId) -> bool {
        self.affinity(from, to).is_some_and(|a| a < 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SocialMode {
    /// `+friends` and/or `-enemies`
    Count { friends: bool, enemies: bool },
    /// `(friends + 1) / (friends + enemies + 1)`
    Ratio,
}

impl Default for SocialMode {
    fn default() -> Self {
        SocialMode::Count {
            friends: true,
            enemies: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SocialAffinity {
    pub graph: SocialGraph,
    pub mode: SocialMode,
}

impl SocialAffinity {
    pub fn new(graph: SocialGraph, mode: SocialMode) -> Self {
        Self { graph, mode }
    }
}

impl UtilityModel for SocialAffinity {
    fn score(
        &self,
        _agent: &TypeVector,
        _neighbors: &[&TypeVector],
        context: &UtilityContext<'_>,
    ) -> Result<f64, UtilityError> {
        let me = context.agent;
        let friends = context.neighbors.iter().filter(|&&n| self.graph.is_friend(me, n)).count() as f64;
        let enemies = context.neighbors.iter().filter(|&&n| self.graph.is_enemy(me, n)).count() as f64;

        Ok(match self.mode {
            SocialMode::Count {
                friends: count_friends,
                enemies: count_enemies,
            } => {
                let mut score = 0.0;
                if count_friends {
                    score += friends;
                }
                if count_enemies {
                    score -= enemies;
                }
                score
            }
            SocialMode::Ratio => (friends + 1.0) / (friends + enemies + 1.0),
        })
    }

    fn range(&self) -> ScoreRange {
        match self.mode {
            SocialMode::Count { friends, enemies } => ScoreRange::new(
                if enemies { f64::NEG_INFINITY } else { 0.0 },
                if friends { f64::INFINITY } else { 0.0 },
            ),
            SocialMode::Ratio => ScoreRange::new(0.0, 1.0),
        }
    }
}
