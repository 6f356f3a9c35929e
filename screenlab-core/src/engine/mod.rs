//! Backtest engine: the per-rebalance screening pipeline and the daily loop.
//!
//! Per rebalance date:
//!
//! 1. `UniverseFilter`: threshold predicates over point-in-time snapshots
//! 2. `RankingEngine`: percentile-score ordering, truncated to portfolio size
//! 3. `PositionSizer`: target weights
//!
//! `Simulation` drives the pipeline on the `RebalanceScheduler` grid and marks
//! the book to market every trading day. `BenchmarkComparator` replays an
//! index over the same grid.

pub mod benchmark;
pub mod filter;
pub mod ranking;
pub mod schedule;
pub mod simulation;
pub mod sizing;

pub use benchmark::BenchmarkComparator;
pub use filter::UniverseFilter;
pub use ranking::{RankedCandidate, RankingEngine};
pub use schedule::RebalanceScheduler;
pub use simulation::{run_simulation, Simulation, SimulationOutput, SimulationState};
pub use sizing::PositionSizer;
