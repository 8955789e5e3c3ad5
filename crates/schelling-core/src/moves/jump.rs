//! Jump rules: an unhappy agent relocates to a vacant node.

use rand::Rng;
use schelling_events::Move;

use super::evaluate::Evaluator;
use super::pick;
use crate::components::Agent;
use crate::error::EngineError;

/// Improving jumps of every unhappy, non-stubborn agent, in ascending id
/// order. `None` marks agents that are not candidates.
fn candidates(evaluator: &Evaluator<'_>, current: &[f64]) -> Vec<Result<Option<Vec<Move>>, EngineError>> {
    let vacant = evaluator.topology.vacant_nodes();
    evaluator.per_agent(|index, agent: &Agent| {
        let before = current[index];
        if !agent.behavior().initiates_moves() || agent.is_happy(before) {
            return Ok(None);
        }
        evaluator.jump_options(agent, before, &vacant).map(Some)
    })
}

/// The first unhappy agent, in id order, with an improving target moves.
pub(crate) fn first<R: Rng + ?Sized>(
    evaluator: &Evaluator<'_>,
    current: &[f64],
    rng: &mut R,
) -> Result<Option<Move>, EngineError> {
    for (index, options) in candidates(evaluator, current).into_iter().enumerate() {
        let Some(options) = options? else { continue };
        if let Some(chosen) = pick(evaluator.pool.by_index(index), options, rng) {
            return Ok(Some(chosen));
        }
    }
    Ok(None)
}

/// The single jump with the greatest improvement across all agents.
///
/// Ties go to the lowest agent id, then the lowest node id. A random agent
/// puts forward one uniformly drawn option instead of all of them.
pub(crate) fn max<R: Rng + ?Sized>(
    evaluator: &Evaluator<'_>,
    current: &[f64],
    rng: &mut R,
) -> Result<Option<Move>, EngineError> {
    let mut best: Option<Move> = None;
    for (index, options) in candidates(evaluator, current).into_iter().enumerate() {
        let Some(options) = options? else { continue };
        for option in super::offered(evaluator.pool.by_index(index), options, rng) {
            let better = match &best {
                Some(b) => option.total_gain() > b.total_gain(),
                None => true,
            };
            if better {
                best = Some(option);
            }
        }
    }
    Ok(best)
}
