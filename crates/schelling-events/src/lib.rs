//! Shared history types and serialization for Schelling game runs.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod ids;
pub mod snapshot;
pub mod stats;

pub use ids::{AgentId, NodeId};

pub use snapshot::{EmptyHistory, Gain, History, Move, RunStatus, Snapshot};

pub use stats::RunStats;
