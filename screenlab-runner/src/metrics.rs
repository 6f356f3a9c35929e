//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity values (and the calendar span
//! they cover) in, scalar out. No dependencies on providers or the engine loop.

use serde::{Deserialize, Serialize};
use screenlab_core::domain::EquityCurve;

/// Trading days per year used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calendar days per year used for CAGR.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Summary risk/return figures for one equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub cagr: f64,
    pub sharpe: f64,
    /// Minimum of the drawdown curve, as a non-positive fraction.
    pub max_drawdown: f64,
    pub total_return: f64,
    pub annual_volatility: f64,
    pub sortino: f64,
    pub calmar: f64,
}

impl Metrics {
    pub fn from_curve(curve: &EquityCurve) -> Self {
        let values = curve.values();
        let elapsed = curve.elapsed_days();
        let max_dd = curve.drawdown_curve().min();
        let cagr = cagr(&values, elapsed);
        Self {
            cagr,
            sharpe: sharpe_ratio(&values),
            max_drawdown: max_dd,
            total_return: total_return(&values),
            annual_volatility: annual_volatility(&values),
            sortino: sortino_ratio(&values),
            calmar: calmar(cagr, max_dd),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&initial), Some(&last)) if values.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound Annual Growth Rate over `elapsed_days` calendar days.
///
/// CAGR = (final / initial)^(365.25 / elapsed_days) - 1. Returns 0.0 when no
/// time has elapsed or either endpoint is non-positive.
pub fn cagr(values: &[f64], elapsed_days: i64) -> f64 {
    let (Some(&initial), Some(&last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    if elapsed_days <= 0 || initial <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    (last / initial).powf(DAYS_PER_YEAR / elapsed_days as f64) - 1.0
}

/// Annualized Sharpe ratio from daily returns, zero risk-free rate.
///
/// Sharpe = mean(daily returns) / sample std(daily returns) * sqrt(252).
/// Returns 0.0 if the deviation is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(values: &[f64]) -> f64 {
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than 2 returns.
pub fn sortino_ratio(values: &[f64]) -> f64 {
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    if downside_sq <= 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Sample standard deviation of daily returns, annualized by sqrt(252).
pub fn annual_volatility(values: &[f64]) -> f64 {
    std_dev(&daily_returns(values)) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|. 0.0 without a drawdown.
pub fn calmar(cagr: f64, max_drawdown: f64) -> f64 {
    if max_drawdown >= 0.0 {
        return 0.0;
    }
    cagr / max_drawdown.abs()
}

/// Maximum drawdown as a non-positive fraction, by a single running-peak scan.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            max_dd = max_dd.min(v / peak - 1.0);
        }
    }
    max_dd
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Compute daily returns from an equity series.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn curve(values: &[f64], step_days: i64) -> EquityCurve {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut c = EquityCurve::new();
        for (i, v) in values.iter().enumerate() {
            c.push(start + Duration::days(i as i64 * step_days), *v);
        }
        c
    }

    #[test]
    fn total_return_known() {
        assert!((total_return(&[100.0, 120.0]) - 0.2).abs() < 1e-12);
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn cagr_one_calendar_year() {
        let c = cagr(&[100.0, 110.0], 365);
        let expected = 1.1_f64.powf(365.25 / 365.0) - 1.0;
        assert!((c - expected).abs() < 1e-12);
    }

    #[test]
    fn cagr_degenerate_inputs() {
        assert_eq!(cagr(&[100.0, 110.0], 0), 0.0);
        assert_eq!(cagr(&[0.0, 110.0], 10), 0.0);
        assert_eq!(cagr(&[100.0, 0.0], 10), 0.0);
        assert_eq!(cagr(&[], 10), 0.0);
    }

    #[test]
    fn sharpe_constant_equity_is_zero() {
        assert_eq!(sharpe_ratio(&[100.0; 30]), 0.0);
    }

    #[test]
    fn sharpe_constant_return_is_zero() {
        let values: Vec<f64> = (0..20).map(|i| 2.0_f64.powi(i)).collect();
        assert_eq!(sharpe_ratio(&values), 0.0);
    }

    #[test]
    fn sharpe_known_returns() {
        // Returns +10%, -10%, +10%: mean 0.0333.., sample std 0.11547..
        let values = [100.0, 110.0, 99.0, 108.9];
        let r = daily_returns(&values);
        let expected = mean_f64(&r) / std_dev(&r) * 252.0_f64.sqrt();
        assert!((sharpe_ratio(&values) - expected).abs() < 1e-12);
        assert!((std_dev(&r) - 0.115_470_053_837_925_15).abs() < 1e-9);
    }

    #[test]
    fn sharpe_needs_two_returns() {
        assert_eq!(sharpe_ratio(&[100.0, 110.0]), 0.0);
    }

    #[test]
    fn sortino_no_downside_is_zero() {
        assert_eq!(sortino_ratio(&[100.0, 101.0, 103.0]), 0.0);
    }

    #[test]
    fn sortino_positive_with_small_downside() {
        assert!(sortino_ratio(&[100.0, 110.0, 108.0, 120.0]) > 0.0);
    }

    #[test]
    fn max_drawdown_known() {
        assert!((max_drawdown(&[100.0, 120.0, 90.0, 130.0]) - (-0.25)).abs() < 1e-12);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn calmar_uses_absolute_drawdown() {
        assert!((calmar(0.2, -0.1) - 2.0).abs() < 1e-12);
        assert_eq!(calmar(0.2, 0.0), 0.0);
    }

    #[test]
    fn flat_curve_metrics_are_zero() {
        let m = Metrics::from_curve(&curve(&[100_000.0; 90], 1));
        assert_eq!(m.cagr, 0.0);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.annual_volatility, 0.0);
    }

    #[test]
    fn from_curve_matches_drawdown_curve() {
        let c = curve(&[100.0, 120.0, 90.0, 130.0], 7);
        let m = Metrics::from_curve(&c);
        assert_eq!(m.max_drawdown, c.drawdown_curve().min());
        assert!((m.max_drawdown - max_drawdown(&c.values())).abs() < 1e-12);
        assert!((m.total_return - 0.3).abs() < 1e-12);
        assert!(m.calmar > 0.0);
    }

    #[test]
    fn empty_curve_is_all_zero() {
        let m = Metrics::from_curve(&EquityCurve::new());
        assert_eq!(m, Metrics {
            cagr: 0.0,
            sharpe: 0.0,
            max_drawdown: 0.0,
            total_return: 0.0,
            annual_volatility: 0.0,
            sortino: 0.0,
            calmar: 0.0,
        });
    }
}
