//! Candidate evaluation
//!
//! Every utility a move rule compares is computed here, against either the
//! current occupancy or the occupancy a candidate move would produce. The
//! topology is never mutated during evaluation.

use std::any::Any;

use rayon::prelude::*;
use schelling_events::{AgentId, Gain, Move, NodeId};

use super::EvaluationMode;
use crate::components::topology::Pending;
use crate::components::{Agent, AgentPool, PlacementView, Topology, TypeVector};
use crate::error::{EngineError, InvariantViolation};
use crate::utility::{UtilityContext, UtilityModel};

/// Read-only scoring over a frozen topology.
pub(crate) struct Evaluator<'a> {
    pub topology: &'a Topology,
    pub pool: &'a AgentPool,
    pub model: &'a dyn UtilityModel,
    pub data: Option<&'a (dyn Any + Send + Sync)>,
    pub mode: EvaluationMode,
}

impl<'a> Evaluator<'a> {
    /// Maps every agent of the pool, in ascending id order.
    pub fn per_agent<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &Agent) -> T + Send + Sync,
    {
        let agents = self.pool.as_slice();
        match self.mode {
            EvaluationMode::Parallel => agents.par_iter().enumerate().map(|(i, a)| f(i, a)).collect(),
            EvaluationMode::Sequential => agents.iter().enumerate().map(|(i, a)| f(i, a)).collect(),
        }
    }

    fn type_of(&self, agent: AgentId) -> Result<&'a TypeVector, InvariantViolation> {
        self.pool
            .get(agent)
            .map(|a| a.type_vector())
            .ok_or(InvariantViolation::AgentLost(agent))
    }

    pub fn node_of(&self, agent: AgentId) -> Result<NodeId, InvariantViolation> {
        self.topology.node_of(agent).ok_or(InvariantViolation::Unplaced(agent))
    }

    /// Utility of `agent` standing on `node` once `pending` is applied.
    pub fn utility(&self, agent: &Agent, node: NodeId, pending: Pending) -> Result<f64, EngineError> {
        let view = PlacementView::pending(self.topology, pending);
        let neighbors = view.neighbor_agents(node);
        let types = neighbors
            .iter()
            .map(|id| self.type_of(*id))
            .collect::<Result<Vec<_>, _>>()?;

        let context = UtilityContext {
            agent: agent.id(),
            node,
            neighbors: &neighbors,
            topology: view,
            data: self.data,
        };
        self.model
            .score(agent.type_vector(), &types, &context)
            .map_err(|source| EngineError::Utility {
                agent: agent.id(),
                node,
                source,
            })
    }

    /// Current utility of every agent, indexed like the pool.
    pub fn current_utilities(&self) -> Result<Vec<f64>, EngineError> {
        self.per_agent(|_, agent| {
            let node = self.node_of(agent.id())?;
            self.utility(agent, node, Pending::None)
        })
        .into_iter()
        .collect()
    }

    /// Improving jumps of one agent, in ascending target order.
    pub fn jump_options(&self, agent: &Agent, before: f64, vacant: &[NodeId]) -> Result<Vec<Move>, EngineError> {
        let from = self.node_of(agent.id())?;
        let mut options = Vec::new();
        for &to in vacant {
            let pending = Pending::Jump {
                agent: agent.id(),
                from,
                to,
            };
            let gain = Gain::new(before, self.utility(agent, to, pending)?);
            if gain.is_improvement() {
                options.push(Move::Jump {
                    agent: agent.id(),
                    from,
                    to,
                    gain,
                });
            }
        }
        Ok(options)
    }

    /// Mutually improving swaps initiated by the agent at pool index `index`,
    /// in ascending partner order.
    pub fn swap_options(&self, index: usize, current: &[f64]) -> Result<Vec<Move>, EngineError> {
        let first = self.pool.by_index(index);
        let first_node = self.node_of(first.id())?;
        let mut options = Vec::new();

        for (j, second) in self.pool.iter().enumerate() {
            if j == index || !second.behavior().initiates_moves() {
                continue;
            }
            let second_node = self.node_of(second.id())?;
            let pending = Pending::Swap {
                first: first.id(),
                first_node,
                second: second.id(),
                second_node,
            };
            let first_gain = Gain::new(current[index], self.utility(first, second_node, pending)?);
            if !first_gain.is_improvement() {
                continue;
            }
            let second_gain = Gain::new(current[j], self.utility(second, first_node, pending)?);
            if second_gain.is_improvement() {
                options.push(Move::Swap {
                    first: first.id(),
                    first_node,
                    second: second.id(),
                    second_node,
                    first_gain,
                    second_gain,
                });
            }
        }
        Ok(options)
    }
}
