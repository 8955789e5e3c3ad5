//! Error Types
//!
//! Configuration errors are detected before any step runs. Invariant
//! violations are fatal and indicate an engine bug. Reaching equilibrium or
//! the iteration cap is not an error and never appears here.

use schelling_events::{AgentId, NodeId};
use thiserror::Error;

/// Invalid input detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("dimension {dimension} has an invalid domain: {reason}")]
    InvalidDomain { dimension: String, reason: String },

    #[error("type vector of {agent} does not match the type space: {reason}")]
    TypeVectorMismatch { agent: AgentId, reason: String },

    #[error("topology has no nodes")]
    EmptyTopology,

    #[error("edge references unknown node {0}")]
    InvalidEdge(NodeId),

    #[error("{0} is not a node of the topology")]
    UnknownNode(NodeId),

    #[error("{0} is not in the agent pool")]
    UnknownAgent(AgentId),

    #[error("agent id {0} is used more than once")]
    DuplicateAgent(AgentId),

    #[error("{node} is assigned to both {first} and {second}")]
    NodeConflict {
        node: NodeId,
        first: AgentId,
        second: AgentId,
    },

    #[error("{0} has no node assignment")]
    UnplacedAgent(AgentId),

    #[error("happiness threshold {threshold} of {agent} is outside the utility range [{lo}, {hi}]")]
    ThresholdOutOfRange {
        agent: AgentId,
        threshold: f64,
        lo: f64,
        hi: f64,
    },

    #[error("happiness threshold of {0} is not a number")]
    InvalidThreshold(AgentId),

    #[error("invalid behavior mix: {0}")]
    InvalidBehaviorMix(String),
}

/// Broken occupancy or move invariant. Always an engine bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("{agent} occupies both {first} and {second}")]
    DuplicatePlacement {
        agent: AgentId,
        first: NodeId,
        second: NodeId,
    },

    #[error("{agent} is recorded at {recorded} but {node} claims it")]
    PositionMismatch {
        agent: AgentId,
        recorded: NodeId,
        node: NodeId,
    },

    #[error("{0} disappeared from the topology")]
    AgentLost(AgentId),

    #[error("{0} has no placement")]
    Unplaced(AgentId),

    #[error("cannot move {agent} to occupied {node}")]
    TargetOccupied { agent: AgentId, node: NodeId },

    #[error("move targets {0}, which is not a node of the topology")]
    MissingNode(NodeId),

    #[error("cannot swap {0} with itself")]
    SelfSwap(AgentId),

    #[error("stubborn {0} was selected to move")]
    StubbornMoved(AgentId),
}

/// Failure raised by a utility model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UtilityError {
    #[error("no preference defined for label '{0}'")]
    UndefinedLabel(String),

    #[error("dimension {index} is missing or has the wrong kind")]
    DimensionMismatch { index: usize },

    #[error("{0}")]
    Custom(String),
}

/// Any failure that aborts a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid move: {0}")]
    InvalidMove(#[from] InvariantViolation),

    #[error("utility evaluation failed for {agent} at {node}: {source}")]
    Utility {
        agent: AgentId,
        node: NodeId,
        #[source]
        source: UtilityError,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
