//! Determinism verification tests
//!
//! Identical inputs and seed must give identical histories, and the
//! evaluation mode must never change the trajectory.

mod common;

use common::{mixed, random_world, ratio_model, strategic};
use schelling_core::{EvaluationMode, MoveRule, RunConfig, SimulationRunner};

fn history_json(seed: u64, rule: MoveRule, evaluation: EvaluationMode, mix: schelling_core::BehaviorMix) -> String {
    let (topology, pool) = random_world(7, 8, 8, mix, 0.5);
    let config = RunConfig::new(rule, 50, seed).with_evaluation(evaluation);
    let report = SimulationRunner::new(topology, pool, ratio_model(), config)
        .unwrap()
        .run()
        .unwrap();
    report.history.to_json_pretty().unwrap()
}

/// Two runs with the same inputs produce identical histories
#[test]
fn test_identical_histories_for_same_seed() {
    for rule in MoveRule::ALL {
        let first = history_json(11, rule, EvaluationMode::Parallel, mixed());
        let second = history_json(11, rule, EvaluationMode::Parallel, mixed());
        assert_eq!(first, second, "{} runs diverged", rule);
    }
}

/// Parallel scoring reduces to the same move as sequential scoring
#[test]
fn test_parallel_matches_sequential() {
    for rule in MoveRule::ALL {
        let parallel = history_json(3, rule, EvaluationMode::Parallel, mixed());
        let sequential = history_json(3, rule, EvaluationMode::Sequential, mixed());
        assert_eq!(parallel, sequential, "{} depends on evaluation mode", rule);
    }
}

/// Strategic-only runs never touch the run RNG, so the seed is irrelevant
#[test]
fn test_strategic_runs_ignore_seed() {
    let first = history_json(1, MoveRule::Jump, EvaluationMode::Parallel, strategic());
    let second = history_json(99, MoveRule::Jump, EvaluationMode::Parallel, strategic());
    assert_eq!(first, second);
}

/// Behavior mixes resolve the same way for the same construction seed
#[test]
fn test_mixed_behavior_resolution_is_reproducible() {
    let (_, first) = random_world(5, 6, 6, mixed(), 0.5);
    let (_, second) = random_world(5, 6, 6, mixed(), 0.5);
    let behaviors = |pool: &schelling_core::AgentPool| pool.iter().map(|a| a.behavior()).collect::<Vec<_>>();
    assert_eq!(behaviors(&first), behaviors(&second));
}
