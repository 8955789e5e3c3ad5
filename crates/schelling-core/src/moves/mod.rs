//! Move Engine
//!
//! Each rule inspects the current occupancy and proposes at most one move.
//! "No move" is the equilibrium signal, not an error.
//!
//! Utilities are scored per agent, in parallel when configured, over a
//! frozen topology. The chosen move always comes from one sequential pass
//! over those scores in ascending agent id order, so the evaluation mode
//! never changes the outcome.

mod evaluate;
mod jump;
mod swap;

use std::any::Any;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Agent, AgentPool, Behavior, Topology};
use crate::error::{EngineError, InvariantViolation};
use crate::utility::UtilityModel;
use evaluate::Evaluator;
use schelling_events::Move;

/// Move-game rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRule {
    /// First unhappy agent with an improving vacant node moves there
    #[default]
    Jump,
    /// First pair whose exchange improves both agents swaps
    Swap,
    /// Globally largest single-agent improvement
    MaxJump,
    /// Mutually improving pair with the largest summed improvement
    MaxSwap,
}

impl MoveRule {
    pub const ALL: [MoveRule; 4] = [MoveRule::Jump, MoveRule::Swap, MoveRule::MaxJump, MoveRule::MaxSwap];

    pub fn is_swap(self) -> bool {
        matches!(self, MoveRule::Swap | MoveRule::MaxSwap)
    }
}

impl fmt::Display for MoveRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveRule::Jump => "jump",
            MoveRule::Swap => "swap",
            MoveRule::MaxJump => "max_jump",
            MoveRule::MaxSwap => "max_swap",
        };
        write!(f, "{}", name)
    }
}

/// How per-agent utilities are computed within one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    #[default]
    Parallel,
    Sequential,
}

/// Finds the next move under one rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveEngine {
    rule: MoveRule,
    mode: EvaluationMode,
}

impl MoveEngine {
    pub fn new(rule: MoveRule, mode: EvaluationMode) -> Self {
        Self { rule, mode }
    }

    pub fn rule(&self) -> MoveRule {
        self.rule
    }

    /// Current utility of every agent, in ascending id order.
    pub fn utilities(
        &self,
        topology: &Topology,
        pool: &AgentPool,
        model: &dyn UtilityModel,
        data: Option<&(dyn Any + Send + Sync)>,
    ) -> Result<Vec<f64>, EngineError> {
        Evaluator {
            topology,
            pool,
            model,
            data,
            mode: self.mode,
        }
        .current_utilities()
    }

    /// Searches for the next move without applying it.
    ///
    /// `rng` is consumed only when a random-behavior agent chooses among
    /// its options, always in ascending agent id order.
    pub fn next_move<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        pool: &AgentPool,
        model: &dyn UtilityModel,
        data: Option<&(dyn Any + Send + Sync)>,
        rng: &mut R,
    ) -> Result<Option<Move>, EngineError> {
        topology.verify()?;
        let evaluator = Evaluator {
            topology,
            pool,
            model,
            data,
            mode: self.mode,
        };
        let current = evaluator.current_utilities()?;

        match self.rule {
            MoveRule::Jump => jump::first(&evaluator, &current, rng),
            MoveRule::MaxJump => jump::max(&evaluator, &current, rng),
            MoveRule::Swap => swap::first(&evaluator, &current, rng),
            MoveRule::MaxSwap => swap::max(&evaluator, &current, rng),
        }
    }
}

/// Gain of the agent that initiated `mv`
fn initiator_gain(mv: &Move) -> f64 {
    match mv {
        Move::Jump { gain, .. } => gain.delta(),
        Move::Swap { first_gain, .. } => first_gain.delta(),
    }
}

/// One agent's choice among its own options.
///
/// Strategic agents take the largest gain, keeping the earliest option on
/// ties; random agents draw uniformly.
fn pick<R: Rng + ?Sized>(agent: &Agent, options: Vec<Move>, rng: &mut R) -> Option<Move> {
    if options.is_empty() {
        return None;
    }
    match agent.behavior() {
        Behavior::Strategic => options.into_iter().reduce(|best, option| {
            if initiator_gain(&option) > initiator_gain(&best) {
                option
            } else {
                best
            }
        }),
        Behavior::Random => {
            let index = rng.gen_range(0..options.len());
            options.into_iter().nth(index)
        }
        Behavior::Stubborn => None,
    }
}

/// Options an agent puts forward to a global maximization.
fn offered<R: Rng + ?Sized>(agent: &Agent, options: Vec<Move>, rng: &mut R) -> Vec<Move> {
    match agent.behavior() {
        Behavior::Strategic => options,
        Behavior::Random => pick(agent, options, rng).into_iter().collect(),
        Behavior::Stubborn => Vec::new(),
    }
}

/// Applies `mv` to the topology after checking it against the pool.
pub(crate) fn apply(topology: &mut Topology, pool: &AgentPool, mv: &Move) -> Result<(), InvariantViolation> {
    for id in mv.agents() {
        let agent = pool.get(id).ok_or(InvariantViolation::AgentLost(id))?;
        if agent.behavior() == Behavior::Stubborn {
            return Err(InvariantViolation::StubbornMoved(id));
        }
    }
    match *mv {
        Move::Jump { agent, from, to, .. } => {
            let recorded = topology.node_of(agent).ok_or(InvariantViolation::Unplaced(agent))?;
            if recorded != from {
                return Err(InvariantViolation::PositionMismatch {
                    agent,
                    recorded,
                    node: from,
                });
            }
            topology.relocate(agent, to)?;
        }
        Move::Swap { first, second, .. } => topology.swap(first, second)?,
    }
    topology.verify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Graph, TypeDimension, TypeSpace, TypeVector};
    use crate::utility::{DimensionWise, Ratio, Similarity};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use schelling_events::{AgentId, Gain, NodeId};

    fn n(raw: u32) -> NodeId {
        NodeId::new(raw)
    }

    fn a(raw: u32) -> AgentId {
        AgentId::new(raw)
    }

    fn ratio() -> DimensionWise {
        DimensionWise::new().with_term(0, 1.0, Ratio::new(Similarity::Exact))
    }

    fn pool(spec: &[(&str, Behavior)]) -> AgentPool {
        let space = TypeSpace::new(vec![TypeDimension::categorical("color", ["A", "B"])]).unwrap();
        let agents = spec
            .iter()
            .enumerate()
            .map(|(i, (label, behavior))| {
                Agent::new(a(i as u32), TypeVector::new(vec![(*label).into()]), *behavior, 0.5)
            })
            .collect();
        AgentPool::new(&space, agents).unwrap()
    }

    fn cycle(len: u32) -> Graph {
        let nodes: Vec<NodeId> = (0..len).map(n).collect();
        let edges: Vec<(NodeId, NodeId)> = (0..len).map(|i| (n(i), n((i + 1) % len))).collect();
        Graph::undirected(nodes, edges).unwrap()
    }

    fn search(rule: MoveRule, topology: &Topology, pool: &AgentPool) -> Option<Move> {
        let mut rng = SmallRng::seed_from_u64(1);
        MoveEngine::new(rule, EvaluationMode::Sequential)
            .next_move(topology, pool, &ratio(), None, &mut rng)
            .unwrap()
    }

    #[test]
    fn test_rule_names() {
        let names: Vec<String> = MoveRule::ALL.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["jump", "swap", "max_jump", "max_swap"]);
        assert!(MoveRule::MaxSwap.is_swap());
        assert!(!MoveRule::MaxJump.is_swap());
    }

    #[test]
    fn test_jump_strategic_takes_best_target() {
        // A@0 B@1 A@2 B@3, node 4 vacant: node 4 neighbors 3 (B) and 0 (A)
        let pool = pool(&[
            ("A", Behavior::Strategic),
            ("B", Behavior::Strategic),
            ("A", Behavior::Strategic),
            ("B", Behavior::Strategic),
        ]);
        let topology = Topology::new(cycle(5), [(a(0), n(0)), (a(1), n(1)), (a(2), n(2)), (a(3), n(3))]).unwrap();

        let mv = search(MoveRule::Jump, &topology, &pool).unwrap();
        assert_eq!(
            mv,
            Move::Jump {
                agent: a(1),
                from: n(1),
                to: n(4),
                gain: Gain::new(0.0, 0.5),
            }
        );
    }

    #[test]
    fn test_stubborn_agents_never_move() {
        let pool = pool(&[("A", Behavior::Stubborn), ("B", Behavior::Stubborn)]);
        let topology = Topology::new(cycle(4), [(a(0), n(0)), (a(1), n(1))]).unwrap();
        for rule in MoveRule::ALL {
            assert_eq!(search(rule, &topology, &pool), None);
        }
    }

    #[test]
    fn test_swap_requires_mutual_gain() {
        // Path A-B-A-B: the ends exchange to give B-B-A-A, both reaching ratio 1
        let pool = pool(&[
            ("A", Behavior::Strategic),
            ("B", Behavior::Strategic),
            ("A", Behavior::Strategic),
            ("B", Behavior::Strategic),
        ]);
        let graph = Graph::undirected(
            [n(0), n(1), n(2), n(3)],
            [(n(0), n(1)), (n(1), n(2)), (n(2), n(3))],
        )
        .unwrap();
        let topology = Topology::new(graph, [(a(0), n(0)), (a(1), n(1)), (a(2), n(2)), (a(3), n(3))]).unwrap();

        let mv = search(MoveRule::Swap, &topology, &pool).unwrap();
        assert!(mv.is_swap());
        assert!(mv.gains().iter().all(|(_, g)| g.is_improvement()));
        assert_eq!(mv.agents(), vec![a(0), a(3)]);
        assert_eq!(mv.total_gain(), 2.0);
    }

    #[test]
    fn test_apply_rejects_stale_origin() {
        let pool = pool(&[("A", Behavior::Strategic)]);
        let mut topology = Topology::new(cycle(3), [(a(0), n(0))]).unwrap();
        let stale = Move::Jump {
            agent: a(0),
            from: n(1),
            to: n(2),
            gain: Gain::new(0.0, 1.0),
        };
        assert!(matches!(
            apply(&mut topology, &pool, &stale),
            Err(InvariantViolation::PositionMismatch { .. })
        ));
        assert_eq!(topology.node_of(a(0)), Some(n(0)));
    }

    #[test]
    fn test_apply_rejects_stubborn_mover() {
        let pool = pool(&[("A", Behavior::Stubborn)]);
        let mut topology = Topology::new(cycle(3), [(a(0), n(0))]).unwrap();
        let mv = Move::Jump {
            agent: a(0),
            from: n(0),
            to: n(1),
            gain: Gain::new(0.0, 1.0),
        };
        assert_eq!(
            apply(&mut topology, &pool, &mv),
            Err(InvariantViolation::StubbornMoved(a(0)))
        );
    }
}
