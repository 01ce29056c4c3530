//! Memoized game-tree search for Santorini positions.
//!
//! The [`Solver`] walks the tree with an explicit frame stack, orders
//! children with the bounded BFS in [`sampler`], and keeps its memo table for
//! the lifetime of the session. Resolved entries can be written to and read
//! from binary checkpoints.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod sampler;
pub mod solver;
pub mod stats;

#[cfg(test)]
mod testing;

pub use checkpoint::Checkpoint;
pub use config::{SearchConfig, SearchMode, SolverConfig};
pub use error::{CheckpointError, ConfigError};
pub use sampler::{sample_score, Sample, NO_TERMINAL};
pub use solver::{Label, NodeState, SolveReport, Solver};
pub use stats::SolverStats;
