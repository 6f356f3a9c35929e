//! ScreenLab Runner: backtest orchestration on top of `screenlab-core`.
//!
//! This crate provides:
//! - TOML configuration files mapped onto the engine's `Configuration`
//! - Metrics (CAGR, Sharpe, max drawdown and supplementary ratios)
//! - Single and benchmark-paired runs with content-hash run ids
//! - Parallel batch execution
//! - JSON/CSV artifact export

pub mod batch;
pub mod config;
pub mod export;
pub mod metrics;
pub mod result;
pub mod runner;

pub use batch::{BatchResults, BatchRunner};
pub use config::{BacktestConfig, ConfigError};
pub use metrics::Metrics;
pub use result::{BacktestResult, BenchmarkResult, SCHEMA_VERSION};
pub use runner::{run_backtest, run_benchmark, run_id, run_with_benchmark, RunError};
