//! Engine Components
//!
//! Type spaces, agents and the topology they occupy.

pub mod agent;
pub mod topology;
pub mod types;

pub use agent::{Agent, AgentPool, Behavior, BehaviorMix, BehaviorSpec, DEFAULT_HAPPINESS};
pub use topology::{Graph, PlacementView, Topology};
pub use types::{Metric, TypeDimension, TypeSpace, TypeValue, TypeVector};
