//! Topology Components
//!
//! The graph agents live on and the injective node -> agent occupancy.
//! Graph construction happens outside the engine; this module only stores
//! adjacency as given and answers neighbor queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::agent::AgentPool;
use crate::error::{ConfigError, InvariantViolation};
use schelling_events::{AgentId, NodeId};

/// Adjacency as supplied by the caller.
///
/// Neighbor lists keep edge multiplicity; a node listed twice counts twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    directed: bool,
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Graph {
    /// Builds a graph. Edges are `(source, target)`; undirected edges are
    /// visible from both ends.
    pub fn new(
        nodes: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
        directed: bool,
    ) -> Result<Self, ConfigError> {
        let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> =
            nodes.into_iter().map(|n| (n, Vec::new())).collect();
        if adjacency.is_empty() {
            return Err(ConfigError::EmptyTopology);
        }

        for (source, target) in edges {
            for node in [source, target] {
                if !adjacency.contains_key(&node) {
                    return Err(ConfigError::InvalidEdge(node));
                }
            }
            if let Some(list) = adjacency.get_mut(&source) {
                list.push(target);
            }
            if !directed && source != target {
                if let Some(list) = adjacency.get_mut(&target) {
                    list.push(source);
                }
            }
        }

        Ok(Self { directed, adjacency })
    }

    pub fn undirected(
        nodes: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Result<Self, ConfigError> {
        Self::new(nodes, edges, false)
    }

    pub fn directed(
        nodes: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> Result<Self, ConfigError> {
        Self::new(nodes, edges, true)
    }

    /// Out-neighbors of a node (empty for unknown nodes)
    pub fn neighbors_of(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }
}

/// A graph plus the partial injective node -> agent mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    graph: Graph,
    by_node: BTreeMap<NodeId, AgentId>,
    by_agent: BTreeMap<AgentId, NodeId>,
}

impl Topology {
    /// Places agents. Every node must exist and the mapping must be injective.
    pub fn new(
        graph: Graph,
        assignment: impl IntoIterator<Item = (AgentId, NodeId)>,
    ) -> Result<Self, ConfigError> {
        let mut by_node = BTreeMap::new();
        let mut by_agent = BTreeMap::new();

        for (agent, node) in assignment {
            if !graph.contains(node) {
                return Err(ConfigError::UnknownNode(node));
            }
            if by_agent.insert(agent, node).is_some() {
                return Err(ConfigError::DuplicateAgent(agent));
            }
            if let Some(first) = by_node.insert(node, agent) {
                return Err(ConfigError::NodeConflict {
                    node,
                    first,
                    second: agent,
                });
            }
        }

        Ok(Self {
            graph,
            by_node,
            by_agent,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn neighbors_of(&self, node: NodeId) -> &[NodeId] {
        self.graph.neighbors_of(node)
    }

    pub fn node_of(&self, agent: AgentId) -> Option<NodeId> {
        self.by_agent.get(&agent).copied()
    }

    pub fn agent_at(&self, node: NodeId) -> Option<AgentId> {
        self.by_node.get(&node).copied()
    }

    pub fn is_vacant(&self, node: NodeId) -> bool {
        self.graph.contains(node) && !self.by_node.contains_key(&node)
    }

    /// Vacant nodes in ascending order
    pub fn vacant_nodes(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|n| !self.by_node.contains_key(n))
            .collect()
    }

    /// Agents occupying the neighbors of `node`, one entry per edge.
    pub fn neighbor_agents(&self, node: NodeId) -> Vec<AgentId> {
        self.neighbors_of(node)
            .iter()
            .filter_map(|n| self.agent_at(*n))
            .collect()
    }

    /// Current placement, occupied nodes only.
    pub fn placement(&self) -> BTreeMap<NodeId, AgentId> {
        self.by_node.clone()
    }

    pub fn agent_count(&self) -> usize {
        self.by_agent.len()
    }

    /// Checks the placement covers exactly the agents of the pool.
    pub(crate) fn check_pool(&self, pool: &AgentPool) -> Result<(), ConfigError> {
        for agent in pool.iter() {
            if !self.by_agent.contains_key(&agent.id()) {
                return Err(ConfigError::UnplacedAgent(agent.id()));
            }
        }
        for agent in self.by_agent.keys() {
            if pool.get(*agent).is_none() {
                return Err(ConfigError::UnknownAgent(*agent));
            }
        }
        Ok(())
    }

    /// Moves an agent onto a vacant node.
    pub(crate) fn relocate(&mut self, agent: AgentId, to: NodeId) -> Result<(), InvariantViolation> {
        if !self.graph.contains(to) {
            return Err(InvariantViolation::MissingNode(to));
        }
        if self.by_node.contains_key(&to) {
            return Err(InvariantViolation::TargetOccupied { agent, node: to });
        }
        let from = self
            .by_agent
            .get(&agent)
            .copied()
            .ok_or(InvariantViolation::Unplaced(agent))?;

        self.by_node.remove(&from);
        self.by_node.insert(to, agent);
        self.by_agent.insert(agent, to);
        Ok(())
    }

    /// Exchanges the nodes of two agents.
    pub(crate) fn swap(&mut self, first: AgentId, second: AgentId) -> Result<(), InvariantViolation> {
        if first == second {
            return Err(InvariantViolation::SelfSwap(first));
        }
        let first_node = self
            .by_agent
            .get(&first)
            .copied()
            .ok_or(InvariantViolation::Unplaced(first))?;
        let second_node = self
            .by_agent
            .get(&second)
            .copied()
            .ok_or(InvariantViolation::Unplaced(second))?;

        self.by_node.insert(first_node, second);
        self.by_node.insert(second_node, first);
        self.by_agent.insert(first, second_node);
        self.by_agent.insert(second, first_node);
        Ok(())
    }

    /// Verifies both directions of the mapping agree and cover the same
    /// agents.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut seen: BTreeMap<AgentId, NodeId> = BTreeMap::new();
        for (node, agent) in &self.by_node {
            if let Some(first) = seen.insert(*agent, *node) {
                return Err(InvariantViolation::DuplicatePlacement {
                    agent: *agent,
                    first,
                    second: *node,
                });
            }
            match self.by_agent.get(agent) {
                Some(recorded) if recorded == node => {}
                Some(recorded) => {
                    return Err(InvariantViolation::PositionMismatch {
                        agent: *agent,
                        recorded: *recorded,
                        node: *node,
                    })
                }
                None => return Err(InvariantViolation::Unplaced(*agent)),
            }
        }
        for agent in self.by_agent.keys() {
            if !seen.contains_key(agent) {
                return Err(InvariantViolation::AgentLost(*agent));
            }
        }
        Ok(())
    }
}

/// A move laid over a topology without mutating it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Pending {
    None,
    /// `agent` has left `from` and stands on `to`
    Jump { agent: AgentId, from: NodeId, to: NodeId },
    /// `first` and `second` have exchanged `first_node` and `second_node`
    Swap {
        first: AgentId,
        first_node: NodeId,
        second: AgentId,
        second_node: NodeId,
    },
}

/// Read-only occupancy as a utility evaluation sees it.
///
/// For a candidate move this is the placement the move would produce, so
/// every lookup agrees with the neighbors handed to the utility model.
#[derive(Debug, Clone, Copy)]
pub struct PlacementView<'a> {
    topology: &'a Topology,
    pending: Pending,
}

impl<'a> PlacementView<'a> {
    /// The topology as it stands.
    pub fn current(topology: &'a Topology) -> Self {
        Self {
            topology,
            pending: Pending::None,
        }
    }

    pub(crate) fn pending(topology: &'a Topology, pending: Pending) -> Self {
        Self { topology, pending }
    }

    pub fn graph(&self) -> &'a Graph {
        self.topology.graph()
    }

    pub fn neighbors_of(&self, node: NodeId) -> &'a [NodeId] {
        self.topology.neighbors_of(node)
    }

    pub fn agent_at(&self, node: NodeId) -> Option<AgentId> {
        match self.pending {
            Pending::None => self.topology.agent_at(node),
            Pending::Jump { agent, from, to } => {
                if node == to {
                    Some(agent)
                } else if node == from {
                    None
                } else {
                    self.topology.agent_at(node)
                }
            }
            Pending::Swap {
                first,
                first_node,
                second,
                second_node,
            } => {
                if node == first_node {
                    Some(second)
                } else if node == second_node {
                    Some(first)
                } else {
                    self.topology.agent_at(node)
                }
            }
        }
    }

    pub fn node_of(&self, agent: AgentId) -> Option<NodeId> {
        match self.pending {
            Pending::Jump { agent: mover, to, .. } if mover == agent => Some(to),
            Pending::Swap {
                first,
                first_node,
                second,
                second_node,
            } => {
                if agent == first {
                    Some(second_node)
                } else if agent == second {
                    Some(first_node)
                } else {
                    self.topology.node_of(agent)
                }
            }
            _ => self.topology.node_of(agent),
        }
    }

    pub fn is_vacant(&self, node: NodeId) -> bool {
        self.topology.graph.contains(node) && self.agent_at(node).is_none()
    }

    /// Agents occupying the neighbors of `node`, one entry per edge.
    pub fn neighbor_agents(&self, node: NodeId) -> Vec<AgentId> {
        self.neighbors_of(node)
            .iter()
            .filter_map(|n| self.agent_at(*n))
            .collect()
    }
}
