//! Backtest runner: wires together the simulation, benchmark and metrics.
//!
//! Entry points:
//! - `run_backtest()`: one configuration against one provider.
//! - `run_benchmark()`: replay a reference index over a configuration's grid.
//! - `run_with_benchmark()`: both; a benchmark failure becomes a warning on
//!   the primary result instead of failing it.

use chrono::NaiveDate;
use thiserror::Error;

use screenlab_core::data::MarketDataProvider;
use screenlab_core::domain::{SimulationWarning, WarningKind};
use screenlab_core::engine::{run_simulation, BenchmarkComparator};
use screenlab_core::{BacktestError, Configuration};

use crate::config::ConfigError;
use crate::metrics::Metrics;
use crate::result::{BacktestResult, BenchmarkResult, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Content hash of a configuration and the provider it runs against.
///
/// Identical inputs give identical ids, so re-runs can be recognized.
pub fn run_id(config: &Configuration, provider: &str) -> Result<String, RunError> {
    let json = serde_json::to_string(config)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(json.as_bytes());
    hasher.update(b"\0");
    hasher.update(provider.as_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}

/// Run one backtest and compute its metrics.
pub fn run_backtest(
    config: &Configuration,
    provider: &dyn MarketDataProvider,
) -> Result<BacktestResult, RunError> {
    let run_id = run_id(config, provider.name())?;
    let output = run_simulation(config.clone(), provider)?;
    let metrics = Metrics::from_curve(&output.equity_curve);
    let drawdown_curve = output.equity_curve.drawdown_curve();

    tracing::info!(
        run_id = &run_id[..12],
        provider = provider.name(),
        days = output.equity_curve.len(),
        rebalances = output.rebalances.len(),
        warnings = output.warnings.len(),
        cagr = metrics.cagr,
        sharpe = metrics.sharpe,
        max_drawdown = metrics.max_drawdown,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        provider: provider.name().to_string(),
        equity_curve: output.equity_curve,
        drawdown_curve,
        metrics,
        rebalances: output.rebalances,
        warnings: output.warnings,
        benchmark: None,
    })
}

/// Replay `symbol` over the configuration's rebalance grid.
///
/// `calendar` pins the valuation days (normally the primary run's curve
/// dates); without it the series' own dates are used.
pub fn run_benchmark(
    config: &Configuration,
    provider: &dyn MarketDataProvider,
    symbol: &str,
    calendar: Option<&[NaiveDate]>,
) -> Result<BenchmarkResult, RunError> {
    let curve = BenchmarkComparator::new(symbol).replay(config, provider, calendar)?;
    tracing::info!(symbol, days = curve.len(), "benchmark replay complete");
    Ok(BenchmarkResult::new(symbol, curve))
}

/// Run a backtest and, when `benchmark` is given, replay it on the same days.
///
/// An unavailable benchmark never fails the primary result; it is recorded
/// as a warning instead.
pub fn run_with_benchmark(
    config: &Configuration,
    provider: &dyn MarketDataProvider,
    benchmark: Option<&str>,
) -> Result<BacktestResult, RunError> {
    let mut result = run_backtest(config, provider)?;
    let Some(symbol) = benchmark else {
        return Ok(result);
    };

    let calendar = result.equity_curve.dates();
    match run_benchmark(config, provider, symbol, Some(&calendar)) {
        Ok(bench) => result.benchmark = Some(bench),
        Err(e) => {
            tracing::warn!(symbol, error = %e, "benchmark skipped");
            result.warnings.push(
                SimulationWarning::new(WarningKind::BenchmarkUnavailable, e.to_string())
                    .for_symbol(symbol),
            );
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenlab_core::data::InMemoryProvider;
    use screenlab_core::domain::PricePoint;
    use screenlab_core::RebalanceFrequency;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config() -> Configuration {
        Configuration::new(
            100_000.0,
            d("2023-01-01"),
            d("2023-01-10"),
            RebalanceFrequency::Monthly,
            1,
        )
    }

    fn provider() -> InMemoryProvider {
        let mut p = InMemoryProvider::new("unit");
        let series = (1..=10)
            .map(|i| {
                PricePoint::new(d("2023-01-01") + chrono::Duration::days(i - 1), 10.0 + i as f64)
            })
            .collect();
        p.insert_price_series("A", series);
        p
    }

    #[test]
    fn run_id_is_deterministic() {
        let cfg = config();
        assert_eq!(run_id(&cfg, "x").unwrap(), run_id(&cfg, "x").unwrap());
        assert_eq!(run_id(&cfg, "x").unwrap().len(), 64);
    }

    #[test]
    fn run_id_changes_with_inputs() {
        let cfg = config();
        let mut other = cfg.clone();
        other.portfolio_size = 2;
        assert_ne!(run_id(&cfg, "x").unwrap(), run_id(&other, "x").unwrap());
        assert_ne!(run_id(&cfg, "x").unwrap(), run_id(&cfg, "y").unwrap());
    }

    #[test]
    fn result_carries_curves_and_metrics() {
        let result = run_backtest(&config(), &provider()).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.provider, "unit");
        assert_eq!(result.equity_curve.len(), 10);
        assert_eq!(result.drawdown_curve.len(), 10);
        assert!(result.metrics.total_return > 0.0);
        assert!(result.benchmark.is_none());
    }

    #[test]
    fn config_errors_are_backtest_errors() {
        let mut cfg = config();
        cfg.initial_capital = -1.0;
        assert!(matches!(
            run_backtest(&cfg, &provider()),
            Err(RunError::Backtest(BacktestError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn missing_benchmark_is_a_warning() {
        let result = run_with_benchmark(&config(), &provider(), Some("NOPE")).unwrap();
        assert!(result.benchmark.is_none());
        assert!(result.warnings.iter().any(|w| {
            w.kind == WarningKind::BenchmarkUnavailable && w.symbol.as_deref() == Some("NOPE")
        }));
    }
}
