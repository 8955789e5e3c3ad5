//! Snapshot Types
//!
//! Serialization structs for placement snapshots and run history.
//!
//! A snapshot captures the complete node -> agent placement at one iteration,
//! together with the moves that produced it. The ordered snapshots of a run
//! form its history, the engine's only externally consumed output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::{AgentId, NodeId};

/// Generates a snapshot ID for the given iteration.
pub fn generate_snapshot_id(iteration: u64) -> String {
    format!("snap_{:06}", iteration)
}

/// Utility of a moving agent before and after a move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    pub before: f64,
    pub after: f64,
}

impl Gain {
    pub fn new(before: f64, after: f64) -> Self {
        Self { before, after }
    }

    /// Utility improvement (after - before)
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }

    /// True if the move strictly improves utility
    pub fn is_improvement(&self) -> bool {
        self.after > self.before
    }
}

/// A single applied move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Move {
    /// An agent relocated to a vacant node
    Jump {
        agent: AgentId,
        from: NodeId,
        to: NodeId,
        gain: Gain,
    },
    /// Two agents exchanged nodes
    Swap {
        first: AgentId,
        first_node: NodeId,
        second: AgentId,
        second_node: NodeId,
        first_gain: Gain,
        second_gain: Gain,
    },
}

impl Move {
    /// Agents that changed node.
    pub fn agents(&self) -> Vec<AgentId> {
        match self {
            Move::Jump { agent, .. } => vec![*agent],
            Move::Swap { first, second, .. } => vec![*first, *second],
        }
    }

    /// Per-agent utility gains.
    pub fn gains(&self) -> Vec<(AgentId, Gain)> {
        match self {
            Move::Jump { agent, gain, .. } => vec![(*agent, *gain)],
            Move::Swap {
                first,
                second,
                first_gain,
                second_gain,
                ..
            } => vec![(*first, *first_gain), (*second, *second_gain)],
        }
    }

    /// Summed utility improvement across every moving agent.
    pub fn total_gain(&self) -> f64 {
        self.gains().iter().map(|(_, g)| g.delta()).sum()
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Move::Jump { .. })
    }

    pub fn is_swap(&self) -> bool {
        matches!(self, Move::Swap { .. })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Jump { agent, from, to, gain } => write!(
                f,
                "{} jumps {} -> {} ({:.3} -> {:.3})",
                agent, from, to, gain.before, gain.after
            ),
            Move::Swap {
                first,
                first_node,
                second,
                second_node,
                ..
            } => write!(
                f,
                "{} @ {} swaps with {} @ {}",
                first, first_node, second, second_node
            ),
        }
    }
}

/// Immutable record of the full placement at one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub iteration: u64,
    /// Occupied nodes only; vacant nodes are absent
    pub placement: BTreeMap<NodeId, AgentId>,
    /// Moves applied to reach this state (empty for the initial snapshot)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<Move>,
}

impl Snapshot {
    /// Creates the iteration-0 snapshot.
    pub fn initial(placement: BTreeMap<NodeId, AgentId>) -> Self {
        Self {
            iteration: 0,
            placement,
            moves: Vec::new(),
        }
    }

    pub fn new(iteration: u64, placement: BTreeMap<NodeId, AgentId>, moves: Vec<Move>) -> Self {
        Self {
            iteration,
            placement,
            moves,
        }
    }

    pub fn snapshot_id(&self) -> String {
        generate_snapshot_id(self.iteration)
    }

    /// Agent occupying a node, if any.
    pub fn agent_at(&self, node: NodeId) -> Option<AgentId> {
        self.placement.get(&node).copied()
    }

    /// Node occupied by an agent, if present.
    pub fn node_of(&self, agent: AgentId) -> Option<NodeId> {
        self.placement
            .iter()
            .find(|(_, a)| **a == agent)
            .map(|(n, _)| *n)
    }

    /// Agents present in this snapshot, ascending.
    pub fn agents(&self) -> BTreeSet<AgentId> {
        self.placement.values().copied().collect()
    }

    /// True if no agent appears on two nodes.
    pub fn is_injective(&self) -> bool {
        self.agents().len() == self.placement.len()
    }

    /// Serializes the snapshot to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Why a run stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The active move rule found no qualifying move
    Equilibrium,
    /// The iteration cap was reached first
    IterationBudgetExhausted,
    /// Stopped by the caller between iterations
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Equilibrium => write!(f, "equilibrium"),
            RunStatus::IterationBudgetExhausted => write!(f, "iteration_budget_exhausted"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A history was read without its initial snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("history has no initial snapshot")]
pub struct EmptyHistory;

/// Ordered snapshots from iteration 0 to the terminal iteration.
///
/// Never empty: deserialization rejects a history without snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistoryRecord")]
pub struct History {
    snapshots: Vec<Snapshot>,
    status: Option<RunStatus>,
}

#[derive(Deserialize)]
struct HistoryRecord {
    snapshots: Vec<Snapshot>,
    #[serde(default)]
    status: Option<RunStatus>,
}

impl TryFrom<HistoryRecord> for History {
    type Error = EmptyHistory;

    fn try_from(record: HistoryRecord) -> Result<Self, Self::Error> {
        if record.snapshots.is_empty() {
            return Err(EmptyHistory);
        }
        Ok(Self {
            snapshots: record.snapshots,
            status: record.status,
        })
    }
}

impl History {
    /// Starts a history from the initial placement.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            snapshots: vec![initial],
            status: None,
        }
    }

    /// Appends the next snapshot. Ignored once the history is finished.
    pub fn push(&mut self, snapshot: Snapshot) {
        if self.status.is_none() {
            self.snapshots.push(snapshot);
        }
    }

    /// Marks the history terminal.
    pub fn finish(&mut self, status: RunStatus) {
        self.status = Some(status);
    }

    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_some()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn initial(&self) -> &Snapshot {
        &self.snapshots[0]
    }

    pub fn last(&self) -> &Snapshot {
        // `new` and deserialization both guarantee at least one snapshot
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn get(&self, iteration: u64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.iteration == iteration)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iteration index of the last recorded snapshot.
    pub fn final_iteration(&self) -> u64 {
        self.last().iteration
    }

    /// Every applied move, in order.
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.snapshots.iter().flat_map(|s| s.moves.iter())
    }

    /// Consecutive (before, after) snapshot pairs.
    pub fn transitions(&self) -> impl Iterator<Item = (&Snapshot, &Snapshot)> {
        self.snapshots.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Serializes the history to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a history from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(pairs: &[(u32, u32)]) -> BTreeMap<NodeId, AgentId> {
        pairs
            .iter()
            .map(|(n, a)| (NodeId::new(*n), AgentId::new(*a)))
            .collect()
    }

    #[test]
    fn test_generate_snapshot_id() {
        assert_eq!(generate_snapshot_id(1), "snap_000001");
        assert_eq!(generate_snapshot_id(42371), "snap_042371");
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = Snapshot::initial(placement(&[(0, 1), (2, 0)]));

        assert_eq!(snapshot.agent_at(NodeId::new(2)), Some(AgentId::new(0)));
        assert_eq!(snapshot.agent_at(NodeId::new(1)), None);
        assert_eq!(snapshot.node_of(AgentId::new(1)), Some(NodeId::new(0)));
        assert!(snapshot.is_injective());
    }

    #[test]
    fn test_non_injective_placement_detected() {
        let snapshot = Snapshot::initial(placement(&[(0, 1), (1, 1)]));
        assert!(!snapshot.is_injective());
    }

    #[test]
    fn test_move_gains() {
        let swap = Move::Swap {
            first: AgentId::new(0),
            first_node: NodeId::new(0),
            second: AgentId::new(1),
            second_node: NodeId::new(3),
            first_gain: Gain::new(0.0, 0.5),
            second_gain: Gain::new(0.25, 1.0),
        };

        assert!(swap.is_swap());
        assert_eq!(swap.agents(), vec![AgentId::new(0), AgentId::new(1)]);
        assert!((swap.total_gain() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_history_ignores_pushes_after_finish() {
        let mut history = History::new(Snapshot::initial(placement(&[(0, 0)])));
        history.push(Snapshot::new(1, placement(&[(1, 0)]), Vec::new()));
        history.finish(RunStatus::Equilibrium);
        history.push(Snapshot::new(2, placement(&[(0, 0)]), Vec::new()));

        assert_eq!(history.len(), 2);
        assert_eq!(history.final_iteration(), 1);
        assert_eq!(history.status(), Some(RunStatus::Equilibrium));
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut snapshot = Snapshot::initial(placement(&[(0, 3), (4, 1)]));
        snapshot.iteration = 2;
        snapshot.moves.push(Move::Jump {
            agent: AgentId::new(1),
            from: NodeId::new(2),
            to: NodeId::new(4),
            gain: Gain::new(0.0, 1.0),
        });

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"kind\":\"jump\""));

        let parsed = Snapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RunStatus::IterationBudgetExhausted).unwrap(),
            r#""iteration_budget_exhausted""#
        );
        assert_eq!(RunStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_history_requires_initial_snapshot() {
        let err = History::from_json(r#"{"snapshots":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no initial snapshot"));

        let mut history = History::new(Snapshot::initial(placement(&[(0, 2)])));
        history.finish(RunStatus::Equilibrium);
        let parsed = History::from_json(&history.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, history);
        assert_eq!(parsed.last().agent_at(NodeId::new(0)), Some(AgentId::new(2)));
    }
}
