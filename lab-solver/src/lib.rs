//! Adaptive construction of surrogates for expensive simulations.
//!
//! The [`Solver`] drives an adaptive hierarchical interpolation whose node
//! batches are evaluated by a pool of worker threads. Each node splits into a
//! cheap coordinate (normalized time, coordinate 0) and expensive coordinates
//! (the reduced stochastic inputs). Simulation results are cached by the grid
//! index of the expensive coordinates, so nodes that differ only in time reuse
//! one simulation.

pub mod cache;
pub mod dispatch;
mod error;
pub mod grid;
pub mod interpolation;
pub mod pool;
mod solver;
pub mod surrogate;
pub mod target;

pub use cache::{Cache, Fingerprint};
pub use error::*;
pub use lab_structs::core::{BatchStats, Progress};
pub use solver::Solver;
pub use surrogate::Surrogate;
pub use target::{CachedSeries, Kernel, Transform};
