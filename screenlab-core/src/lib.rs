//! ScreenLab Core: deterministic backtests of fundamental-screen equity strategies.
//!
//! This crate contains the engine:
//! - Domain types (snapshots, holdings, equity and drawdown curves, warnings)
//! - The validated `Configuration` value object
//! - The `MarketDataProvider` interface plus in-memory, CSV and synthetic providers
//! - Rebalance scheduling, universe filtering, ranking and position sizing
//! - The daily simulation loop and the benchmark replay

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::{
    Configuration, Direction, FilterThresholds, RankCriterion, RankingSpec, RebalanceFrequency,
    SizingMode,
};
pub use error::{BacktestError, ParseError};
