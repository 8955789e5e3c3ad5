//! Agent Components
//!
//! Agents, their move behaviors and the pool the engine reads them from.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{TypeSpace, TypeVector};
use crate::error::ConfigError;
use schelling_events::AgentId;

/// Happiness threshold used when none is configured
pub const DEFAULT_HAPPINESS: f64 = 0.5;

/// How an agent explores candidate moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Picks uniformly among improving candidates
    #[default]
    Random,
    /// Takes the utility-maximizing candidate
    Strategic,
    /// Never moves
    Stubborn,
}

impl Behavior {
    pub fn initiates_moves(self) -> bool {
        !matches!(self, Behavior::Stubborn)
    }
}

/// Weighted mixture over behaviors, resolved once per agent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorMix {
    pub random: f64,
    pub strategic: f64,
    pub stubborn: f64,
}

impl BehaviorMix {
    pub fn new(random: f64, strategic: f64, stubborn: f64) -> Self {
        Self {
            random,
            strategic,
            stubborn,
        }
    }

    /// Draws one concrete behavior. Weights must be finite, non-negative and
    /// not all zero.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Behavior, ConfigError> {
        const CHOICES: [Behavior; 3] = [Behavior::Random, Behavior::Strategic, Behavior::Stubborn];
        let weights = [self.random, self.strategic, self.stubborn];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::InvalidBehaviorMix(format!("non-finite weight in {:?}", self)));
        }
        let index = WeightedIndex::new(weights)
            .map_err(|e| ConfigError::InvalidBehaviorMix(e.to_string()))?;
        Ok(CHOICES[index.sample(rng)])
    }
}

/// Either a fixed behavior or a mixture to resolve at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BehaviorSpec {
    Fixed(Behavior),
    Mixed(BehaviorMix),
}

impl Default for BehaviorSpec {
    fn default() -> Self {
        BehaviorSpec::Fixed(Behavior::default())
    }
}

impl BehaviorSpec {
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Behavior, ConfigError> {
        match self {
            BehaviorSpec::Fixed(behavior) => Ok(*behavior),
            BehaviorSpec::Mixed(mix) => mix.resolve(rng),
        }
    }
}

/// An agent. Immutable once built; only its node changes during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    type_vector: TypeVector,
    behavior: Behavior,
    happiness_threshold: f64,
}

impl Agent {
    pub fn new(id: AgentId, type_vector: TypeVector, behavior: Behavior, happiness_threshold: f64) -> Self {
        Self {
            id,
            type_vector,
            behavior,
            happiness_threshold,
        }
    }

    /// Builds an agent whose behavior is drawn from a mixture.
    pub fn mixed<R: Rng + ?Sized>(
        id: AgentId,
        type_vector: TypeVector,
        mix: &BehaviorMix,
        happiness_threshold: f64,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let behavior = mix.resolve(rng)?;
        Ok(Self::new(id, type_vector, behavior, happiness_threshold))
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn type_vector(&self) -> &TypeVector {
        &self.type_vector
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn happiness_threshold(&self) -> f64 {
        self.happiness_threshold
    }

    pub fn is_happy(&self, utility: f64) -> bool {
        utility >= self.happiness_threshold
    }
}

/// Validated agents, ordered by ascending id.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPool {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl AgentPool {
    /// Checks ids are unique, type vectors match the space and thresholds
    /// are numbers.
    pub fn new(space: &TypeSpace, mut agents: Vec<Agent>) -> Result<Self, ConfigError> {
        agents.sort_by_key(|a| a.id);
        let mut index = HashMap::with_capacity(agents.len());
        for (i, agent) in agents.iter().enumerate() {
            if index.insert(agent.id, i).is_some() {
                return Err(ConfigError::DuplicateAgent(agent.id));
            }
            space.check(agent.id, &agent.type_vector)?;
            if agent.happiness_threshold.is_nan() {
                return Err(ConfigError::InvalidThreshold(agent.id));
            }
        }
        Ok(Self { agents, index })
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    /// Position of an agent in ascending-id order.
    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn by_index(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::types::{TypeDimension, TypeValue};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn space() -> TypeSpace {
        TypeSpace::new(vec![TypeDimension::categorical("color", ["a", "b"])]).unwrap()
    }

    fn vector(label: &str) -> TypeVector {
        TypeVector::new(vec![TypeValue::label(label)])
    }

    #[test]
    fn test_pool_orders_by_id() {
        let pool = AgentPool::new(
            &space(),
            vec![
                Agent::new(AgentId::new(5), vector("a"), Behavior::Strategic, 0.5),
                Agent::new(AgentId::new(1), vector("b"), Behavior::Random, 0.5),
            ],
        )
        .unwrap();

        assert_eq!(pool.ids(), vec![AgentId::new(1), AgentId::new(5)]);
        assert_eq!(pool.index_of(AgentId::new(5)), Some(1));
        assert_eq!(pool.get(AgentId::new(1)).unwrap().behavior(), Behavior::Random);
    }

    #[test]
    fn test_pool_rejects_duplicates_and_bad_vectors() {
        let dup = AgentPool::new(
            &space(),
            vec![
                Agent::new(AgentId::new(1), vector("a"), Behavior::Strategic, 0.5),
                Agent::new(AgentId::new(1), vector("b"), Behavior::Strategic, 0.5),
            ],
        );
        assert_eq!(dup.unwrap_err(), ConfigError::DuplicateAgent(AgentId::new(1)));

        let bad = AgentPool::new(
            &space(),
            vec![Agent::new(AgentId::new(1), vector("z"), Behavior::Strategic, 0.5)],
        );
        assert!(matches!(bad.unwrap_err(), ConfigError::TypeVectorMismatch { .. }));

        let nan = AgentPool::new(
            &space(),
            vec![Agent::new(AgentId::new(1), vector("a"), Behavior::Strategic, f64::NAN)],
        );
        assert!(matches!(nan.unwrap_err(), ConfigError::InvalidThreshold(_)));
    }

    #[test]
    fn test_mix_resolution_is_deterministic() {
        let mix = BehaviorMix::new(0.3, 0.5, 0.2);
        let draw = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..50).map(|_| mix.resolve(&mut rng).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
    }

    #[test]
    fn test_degenerate_mix_always_picks_the_weighted_behavior() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mix = BehaviorMix::new(0.0, 0.0, 1.0);
        for _ in 0..20 {
            assert_eq!(mix.resolve(&mut rng).unwrap(), Behavior::Stubborn);
        }
    }

    #[test]
    fn test_invalid_mix() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(BehaviorMix::new(0.0, 0.0, 0.0).resolve(&mut rng).is_err());
        assert!(BehaviorMix::new(-1.0, 2.0, 0.0).resolve(&mut rng).is_err());
    }

    #[test]
    fn test_behavior_spec_deserialization() {
        let fixed: BehaviorSpec = serde_json::from_str(r#""stubborn""#).unwrap();
        assert_eq!(fixed, BehaviorSpec::Fixed(Behavior::Stubborn));

        let mixed: BehaviorSpec = serde_json::from_str(r#"{"strategic": 0.9, "random": 0.1}"#).unwrap();
        assert_eq!(mixed, BehaviorSpec::Mixed(BehaviorMix::new(0.1, 0.9, 0.0)));
    }

    #[test]
    fn test_happiness() {
        let agent = Agent::new(AgentId::new(0), vector("a"), Behavior::Strategic, 0.5);
        assert!(agent.is_happy(0.5));
        assert!(!agent.is_happy(0.49));
        assert!(!Behavior::Stubborn.initiates_moves());
    }
}
