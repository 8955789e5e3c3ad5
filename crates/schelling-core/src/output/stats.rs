//! Statistics Output
//!
//! Folds a finished history and the utilities measured at both ends of the
//! run into [`RunStats`].

use schelling_events::{History, Move, RunStats};

use crate::components::AgentPool;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Builds run statistics.
///
/// `initial` and `last` are per-agent utilities in pool order at the first
/// and final snapshot.
pub fn summarize(history: &History, pool: &AgentPool, initial: &[f64], last: &[f64]) -> RunStats {
    let (mut jumps, mut swaps) = (0, 0);
    for mv in history.moves() {
        match mv {
            Move::Jump { .. } => jumps += 1,
            Move::Swap { .. } => swaps += 1,
        }
    }

    let unhappy_agents: Vec<_> = pool
        .iter()
        .zip(last)
        .filter(|(agent, utility)| !agent.is_happy(**utility))
        .map(|(agent, _)| agent.id())
        .collect();
    let final_happy_fraction = if pool.is_empty() {
        1.0
    } else {
        (pool.len() - unhappy_agents.len()) as f64 / pool.len() as f64
    };

    RunStats {
        iterations: history.final_iteration(),
        jumps,
        swaps,
        initial_mean_utility: mean(initial),
        final_mean_utility: mean(last),
        final_happy_fraction,
        unhappy_agents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Agent, Behavior, TypeSpace, TypeVector};
    use schelling_events::{AgentId, Gain, NodeId, Snapshot};
    use std::collections::BTreeMap;

    #[test]
    fn test_summarize_counts_moves_and_happiness() {
        let space = TypeSpace::new(vec![]).unwrap();
        let pool = AgentPool::new(
            &space,
            vec![
                Agent::new(AgentId::new(0), TypeVector::new(vec![]), Behavior::Strategic, 0.5),
                Agent::new(AgentId::new(1), TypeVector::new(vec![]), Behavior::Strategic, 0.5),
            ],
        )
        .unwrap();

        let placement: BTreeMap<NodeId, AgentId> =
            [(NodeId::new(0), AgentId::new(0)), (NodeId::new(1), AgentId::new(1))].into();
        let mut history = History::new(Snapshot::initial(placement.clone()));
        let mut moved = placement;
        moved.remove(&NodeId::new(0));
        moved.insert(NodeId::new(2), AgentId::new(0));
        history.push(Snapshot::new(
            1,
            moved,
            vec![Move::Jump {
                agent: AgentId::new(0),
                from: NodeId::new(0),
                to: NodeId::new(2),
                gain: Gain::new(0.0, 1.0),
            }],
        ));

        let stats = summarize(&history, &pool, &[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.jumps, 1);
        assert_eq!(stats.swaps, 0);
        assert_eq!(stats.final_mean_utility, 0.5);
        assert_eq!(stats.final_happy_fraction, 0.5);
        assert_eq!(stats.unhappy_agents, vec![AgentId::new(1)]);
    }
}
