//! Swap rules: two non-stubborn agents exchange nodes when both strictly
//! gain.

use rand::Rng;
use schelling_events::{AgentId, Move};

use super::evaluate::Evaluator;
use super::pick;
use crate::error::EngineError;

fn candidates(evaluator: &Evaluator<'_>, current: &[f64]) -> Vec<Result<Option<Vec<Move>>, EngineError>> {
    evaluator.per_agent(|index, agent| {
        if !agent.behavior().initiates_moves() {
            return Ok(None);
        }
        evaluator.swap_options(index, current).map(Some)
    })
}

/// The first initiator, in id order, with a mutually improving partner
/// swaps. A strategic initiator takes the partner that gains it the most.
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

/// Participants of a swap as `(lower id, higher id)`
fn pair_key(mv: &Move) -> (AgentId, AgentId) {
    match *mv {
        Move::Swap { first, second, .. } => (first.min(second), first.max(second)),
        Move::Jump { agent, .. } => (agent, agent),
    }
}

/// The mutually improving swap with the greatest summed gain.
///
/// Ties go to the lowest pair of ids.
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
                Some(b) => {
                    let (gain, best_gain) = (option.total_gain(), b.total_gain());
                    gain > best_gain || (gain == best_gain && pair_key(&option) < pair_key(b))
                }
                None => true,
            };
            if better {
                best = Some(option);
            }
        }
    }
    Ok(best)
}
