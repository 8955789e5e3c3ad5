//! Identifier Types
//!
//! Stable identifiers for graph nodes and agents.
//!
//! # Example
//!
//! ```
//! use schelling_events::{AgentId, NodeId};
//!
//! let agent = AgentId::new(3);
//! assert_eq!(agent.to_string(), "agent_0003");
//! assert!(NodeId::new(1) < NodeId::new(2));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in the topology.
///
/// Ordering is numeric and is what every deterministic tie-break uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{:04}", self.0)
    }
}

/// Identifier of an agent, unique and stable for the agent's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for AgentId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent_{:04}", self.0)
    }
}
