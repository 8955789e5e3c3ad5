//! Scenario Files
//!
//! A scenario is a TOML description of a complete run: the type space, the
//! graph, the agents and their placement, the utility model and the run
//! settings. Building a scenario performs every engine validation, so a
//! scenario that builds is ready to run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Deserialize;
use thiserror::Error;

use schelling_core::utility::{
    Blend, Count, Criterion, DimensionWise, Ratio, Similarity, SocialAffinity, SocialGraph, SocialMode, ThresholdMode,
};
use schelling_core::{
    default_for, Agent, AgentId, AgentPool, BehaviorSpec, ConfigError, Graph, Metric, NodeId, RunConfig,
    SimulationRunner, Topology, TypeDimension, TypeSpace, TypeVector, UtilityModel, DEFAULT_HAPPINESS,
};

/// Scenario loading error
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid scenario: {0}")]
    Build(#[from] ConfigError),

    #[error("Invalid scenario: {0}")]
    Reference(String),
}

/// Top-level scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub simulation: RunConfig,
    #[serde(default)]
    pub dimensions: Vec<TypeDimension>,
    pub graph: GraphSpec,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub utility: UtilitySpec,
}

/// Explicit graph; nodes are numbered from zero
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSpec {
    pub nodes: u32,
    #[serde(default)]
    pub edges: Vec<(u32, u32)>,
    #[serde(default)]
    pub directed: bool,
}

impl GraphSpec {
    pub fn build(&self) -> Result<Graph, ConfigError> {
        Graph::new(
            (0..self.nodes).map(NodeId::new),
            self.edges.iter().map(|&(a, b)| (NodeId::new(a), NodeId::new(b))),
            self.directed,
        )
    }
}

/// One agent and its initial node
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSpec {
    pub id: u32,
    pub node: u32,
    #[serde(rename = "type", default)]
    pub type_vector: TypeVector,
    #[serde(default)]
    pub behavior: BehaviorSpec,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_HAPPINESS
}

/// Utility model description. No terms means the default model for the
/// type space.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtilitySpec {
    #[serde(default)]
    pub terms: Vec<TermSpec>,
    pub satisfaction: Option<SatisfactionSpec>,
    pub social: Option<SocialSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Count,
    #[default]
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimilaritySpec {
    #[default]
    Exact,
    Within {
        max_distance: f64,
        #[serde(default)]
        metric: Metric,
    },
    Linear {
        span: f64,
    },
}

impl From<SimilaritySpec> for Similarity {
    fn from(spec: SimilaritySpec) -> Self {
        match spec {
            SimilaritySpec::Exact => Similarity::Exact,
            SimilaritySpec::Within { max_distance, metric } => Similarity::Within { max_distance, metric },
            SimilaritySpec::Linear { span } => Similarity::Linear { span },
        }
    }
}

/// One per-dimension criterion
#[derive(Debug, Clone, Deserialize)]
pub struct TermSpec {
    pub dimension: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub criterion: CriterionKind,
    #[serde(default)]
    pub similarity: SimilaritySpec,
    pub min_neighbors: Option<usize>,
    pub fallback: Option<f64>,
    #[serde(default)]
    pub self_inclusive: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

fn default_weight() -> f64 {
    1.0
}

impl TermSpec {
    fn criterion(&self) -> Box<dyn Criterion> {
        let similarity = Similarity::from(self.similarity);
        match self.criterion {
            CriterionKind::Count => Box::new(Count::new(similarity).bounded(self.min, self.max)),
            CriterionKind::Ratio => {
                let mut ratio = if self.self_inclusive {
                    Ratio::self_inclusive(similarity)
                } else {
                    Ratio::new(similarity)
                };
                if let Some(min_neighbors) = self.min_neighbors {
                    ratio.min_neighbors = min_neighbors;
                }
                if let Some(fallback) = self.fallback {
                    ratio.fallback = fallback;
                }
                Box::new(ratio.bounded(self.min, self.max))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SatisfactionSpec {
    pub threshold: f64,
    #[serde(default)]
    pub mode: ThresholdMode,
}

/// Friends/enemies term, blended with the type term
#[derive(Debug, Clone, Deserialize)]
pub struct SocialSpec {
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub mode: SocialMode,
    #[serde(default)]
    pub directed: bool,
    /// `[from, to, affinity]` triples
    #[serde(default)]
    pub affinities: Vec<(u32, u32, f64)>,
}

impl UtilitySpec {
    pub fn build(&self, space: &TypeSpace) -> Result<Arc<dyn UtilityModel>, ScenarioError> {
        let mut types = if self.terms.is_empty() {
            default_for(space)
        } else {
            let mut model = DimensionWise::new();
            for term in &self.terms {
                let index = space
                    .index_of(&term.dimension)
                    .ok_or_else(|| ScenarioError::Reference(format!("unknown dimension '{}'", term.dimension)))?;
                model = model.with_boxed_term(index, term.weight, term.criterion());
            }
            model
        };
        if let Some(satisfaction) = self.satisfaction {
            types = types.with_satisfaction(satisfaction.threshold, satisfaction.mode);
        }

        let Some(social) = &self.social else {
            return Ok(Arc::new(types));
        };
        let graph = social
            .affinities
            .iter()
            .fold(SocialGraph::new(social.directed), |graph, &(from, to, affinity)| {
                graph.with(AgentId::new(from), AgentId::new(to), affinity)
            });
        let blend = Blend::new()
            .with(1.0, types)
            .with(social.weight, SocialAffinity::new(graph, social.mode));
        Ok(Arc::new(blend))
    }
}

impl Scenario {
    /// Loads a scenario from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parses a scenario from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    /// Validates everything and returns a runner ready to start.
    ///
    /// Behavior mixes are resolved here from the scenario seed, in agent
    /// order as listed.
    pub fn build(&self) -> Result<SimulationRunner, ScenarioError> {
        let space = TypeSpace::new(self.dimensions.clone())?;
        let mut rng = SmallRng::seed_from_u64(self.simulation.seed);

        let mut agents = Vec::with_capacity(self.agents.len());
        let mut assignment = Vec::with_capacity(self.agents.len());
        for spec in &self.agents {
            let behavior = spec.behavior.resolve(&mut rng)?;
            let id = AgentId::new(spec.id);
            agents.push(Agent::new(id, spec.type_vector.clone(), behavior, spec.threshold));
            assignment.push((id, NodeId::new(spec.node)));
        }

        let pool = AgentPool::new(&space, agents)?;
        let topology = Topology::new(self.graph.build()?, assignment)?;
        let model = self.utility.build(&space)?;
        Ok(SimulationRunner::new(topology, pool, model, self.simulation.clone())?)
    }

    /// Counts of (nodes, agents, vacant nodes)
    pub fn census(&self) -> Result<(usize, usize, usize), ScenarioError> {
        let nodes = self.graph.build()?.node_count();
        let agents = self.agents.len();
        Ok((nodes, agents, nodes.saturating_sub(agents)))
    }
}

/// Per-label counts of the first categorical dimension, for summaries
pub fn label_counts(scenario: &Scenario) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    let Some(index) = scenario.dimensions.iter().position(|d| d.is_categorical()) else {
        return counts;
    };
    for agent in &scenario.agents {
        if let Some(label) = agent.type_vector.get(index).and_then(|v| v.as_label()) {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use schelling_core::{Behavior, MoveRule, RunStatus};

    const CYCLE: &str = r#"
[simulation]
rule = "jump"
seed = 1

[[dimensions]]
kind = "categorical"
name = "color"
labels = ["A", "B"]

[graph]
nodes = 5
edges = [[0, 1], [1, 2], [2, 3], [3, 4], [4, 0]]

[[agents]]
id = 0
node = 0
type = ["A"]
behavior = "strategic"

[[agents]]
id = 1
node = 1
type = ["B"]
behavior = "strategic"

[[agents]]
id = 2
node = 2
type = ["A"]
behavior = "strategic"

[[agents]]
id = 3
node = 3
type = ["B"]
behavior = "strategic"
"#;

    #[test]
    fn test_parse_cycle_scenario() {
        let scenario = Scenario::from_str(CYCLE).unwrap();
        assert_eq!(scenario.simulation.rule, MoveRule::Jump);
        assert_eq!(scenario.simulation.max_iterations, 200);
        assert_eq!(scenario.agents.len(), 4);
        assert_eq!(scenario.agents[0].threshold, DEFAULT_HAPPINESS);
        assert_eq!(scenario.census().unwrap(), (5, 4, 1));
    }

    #[test]
    fn test_build_and_run() {
        let runner = Scenario::from_str(CYCLE).unwrap().build().unwrap();
        let report = runner.run().unwrap();
        assert_eq!(report.status(), Some(RunStatus::Equilibrium));
        assert_eq!(report.stats.jumps, 2);
    }

    #[test]
    fn test_mixed_behavior_and_terms() {
        let text = r#"
[[dimensions]]
kind = "categorical"
name = "color"
labels = ["A", "B"]

[[dimensions]]
kind = "continuous"
name = "income"
lo = 0.0
hi = 100.0

[graph]
nodes = 9
edges = [[0, 1], [1, 2], [3, 4], [4, 5], [6, 7], [7, 8], [0, 3], [3, 6], [1, 4], [4, 7], [2, 5], [5, 8]]

[[agents]]
id = 0
node = 4
type = ["A", 50.0]
behavior = { random = 1.0, strategic = 0.0 }
threshold = 0.25

[[utility.terms]]
dimension = "income"
criterion = "count"
similarity = { kind = "within", max_distance = 5.0 }

[utility.social]
weight = 0.5
affinities = [[0, 1, 1.0]]
"#;
        let scenario = Scenario::from_str(text).unwrap();
        let runner = scenario.build().unwrap();
        assert_eq!(runner.pool().iter().next().map(|a| a.behavior()), Some(Behavior::Random));
        assert_eq!(label_counts(&scenario).get("A"), Some(&1));
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let text = CYCLE.to_string() + "\n[[utility.terms]]\ndimension = \"height\"\n";
        let err = Scenario::from_str(&text).unwrap().build().err().unwrap();
        assert!(matches!(err, ScenarioError::Reference(_)));
    }

    #[test]
    fn test_conflicting_placement_rejected() {
        let text = CYCLE.replace("node = 3", "node = 0");
        let err = Scenario::from_str(&text).unwrap().build().err().unwrap();
        assert!(matches!(err, ScenarioError::Build(ConfigError::NodeConflict { .. })));
    }

    #[test]
    fn test_directed_edges() {
        let graph = GraphSpec {
            nodes: 3,
            edges: vec![(0, 1), (2, 1)],
            directed: true,
        }
        .build()
        .unwrap();
        assert_eq!(graph.neighbors_of(NodeId::new(2)), &[NodeId::new(1)]);
        assert!(graph.neighbors_of(NodeId::new(1)).is_empty());
    }

    #[test]
    fn test_edge_outside_graph_rejected() {
        let text = CYCLE.replace("[4, 0]", "[4, 9]");
        let err = Scenario::from_str(&text).unwrap().build().err().unwrap();
        assert!(matches!(err, ScenarioError::Build(ConfigError::InvalidEdge(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load("/nonexistent/scenario.toml").unwrap_err();
        assert!(matches!(err, ScenarioError::Io(_)));
    }
}
