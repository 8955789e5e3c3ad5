//! Run output: summary statistics over a finished history.

pub mod stats;

pub use stats::summarize;
