//! Run results and the persisted artifact schema.

use serde::{Deserialize, Serialize};

use screenlab_core::domain::{DrawdownCurve, EquityCurve, Rebalance, SimulationWarning};
use screenlab_core::Configuration;

use crate::metrics::Metrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Default schema version for JSON written before the field existed.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of one backtest. Immutable once the runner returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: Configuration,
    /// Name of the market data provider the run read from.
    pub provider: String,
    pub equity_curve: EquityCurve,
    pub drawdown_curve: DrawdownCurve,
    pub metrics: Metrics,
    pub rebalances: Vec<Rebalance>,
    #[serde(default)]
    pub warnings: Vec<SimulationWarning>,
    /// Present when a benchmark replay was requested and succeeded.
    #[serde(default)]
    pub benchmark: Option<BenchmarkResult>,
}

impl BacktestResult {
    pub fn final_value(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.value)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Equity curve of a reference index replayed over the run's grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub symbol: String,
    pub equity_curve: EquityCurve,
    pub drawdown_curve: DrawdownCurve,
}

impl BenchmarkResult {
    pub fn new(symbol: impl Into<String>, equity_curve: EquityCurve) -> Self {
        let drawdown_curve = equity_curve.drawdown_curve();
        Self {
            symbol: symbol.into(),
            equity_curve,
            drawdown_curve,
        }
    }

    /// Metrics on request, computed with the same calculator as the primary run.
    pub fn metrics(&self) -> Metrics {
        Metrics::from_curve(&self.equity_curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn benchmark_result_derives_drawdown() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut curve = EquityCurve::new();
        curve.push(d, 100.0);
        curve.push(d.succ_opt().unwrap(), 80.0);
        let b = BenchmarkResult::new("IDX", curve);
        assert_eq!(b.drawdown_curve.len(), 2);
        assert!((b.drawdown_curve.min() + 0.2).abs() < 1e-12);
        assert!((b.metrics().total_return + 0.2).abs() < 1e-12);
    }
}
