//! Schelling game engine: type spaces, agents, utility models, move rules
//! and the run loop.
//!
//! The engine consumes an already built topology and agent pool, and
//! produces the full placement history of a run.

pub mod components;
pub mod config;
pub mod error;
pub mod moves;
pub mod output;
pub mod runner;
pub mod utility;

pub use components::{
    Agent, AgentPool, Behavior, BehaviorMix, BehaviorSpec, Graph, Metric, PlacementView, Topology, TypeDimension,
    TypeSpace, TypeValue, TypeVector, DEFAULT_HAPPINESS,
};
pub use config::RunConfig;
pub use error::{ConfigError, EngineError, EngineResult, InvariantViolation, UtilityError};
pub use moves::{EvaluationMode, MoveEngine, MoveRule};
pub use runner::{run, CancelToken, RunReport, SimulationRunner};
pub use utility::{default_for, utility_fn, ScoreRange, UtilityContext, UtilityModel};

pub use schelling_events::{AgentId, EmptyHistory, Gain, History, Move, NodeId, RunStats, RunStatus, Snapshot};
