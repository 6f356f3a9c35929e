//! Replays a single index series over the same rebalance grid.

use chrono::NaiveDate;

use super::schedule::RebalanceScheduler;
use crate::config::Configuration;
use crate::data::MarketDataProvider;
use crate::domain::{EquityCurve, PricePoint};
use crate::error::BacktestError;

/// Holds one reference series at weight 1, scaled to the initial capital.
///
/// No filtering, ranking or sizing happens: on each rebalance day the whole
/// value is re-invested in the series at that day's (or the last known)
/// price. Before the first print the capital stays in cash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkComparator {
    pub symbol: String,
}

impl BenchmarkComparator {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// Fetch the series from `provider` and replay it.
    ///
    /// `calendar` is the set of valuation days (normally the primary run's
    /// curve dates); without one the series' own dates are used.
    pub fn replay(
        &self,
        config: &Configuration,
        provider: &dyn MarketDataProvider,
        calendar: Option<&[NaiveDate]>,
    ) -> Result<EquityCurve, BacktestError> {
        config.validate()?;
        let series = provider
            .fetch_prices(&self.symbol, config.start_date, config.end_date)
            .map_err(|e| self.unavailable(e.to_string()))?;
        self.replay_series(config, &series, calendar)
    }

    pub fn replay_series(
        &self,
        config: &Configuration,
        series: &[PricePoint],
        calendar: Option<&[NaiveDate]>,
    ) -> Result<EquityCurve, BacktestError> {
        let (start, end) = (config.start_date, config.end_date);
        let mut prints: Vec<PricePoint> = series.iter().filter(|p| p.is_valid()).copied().collect();
        prints.sort_by_key(|p| p.date);
        if prints.is_empty() {
            return Err(self.unavailable("series has no valid prints".into()));
        }

        let days: Vec<NaiveDate> = calendar
            .map(<[NaiveDate]>::to_vec)
            .unwrap_or_else(|| prints.iter().map(|p| p.date).collect())
            .into_iter()
            .filter(|d| *d >= start && *d <= end)
            .collect();
        if days.is_empty() {
            return Err(self.unavailable(format!("no valuation days between {start} and {end}")));
        }

        let schedule =
            RebalanceScheduler::new(config.frequency).trading_schedule(start, end, &days)?;
        let mut next_rebalance = schedule.iter().copied().peekable();

        let mut cash = config.initial_capital;
        let mut units = 0.0;
        let mut last: Option<f64> = None;
        let mut cursor = 0;
        let mut pending = false;
        let mut curve = EquityCurve::with_capacity(days.len());

        for (t, date) in days.iter().enumerate() {
            while cursor < prints.len() && prints[cursor].date <= *date {
                last = Some(prints[cursor].close);
                cursor += 1;
            }
            if next_rebalance.peek() == Some(&t) {
                next_rebalance.next();
                pending = true;
            }
            if let (true, Some(price)) = (pending, last) {
                let value = cash + units * price;
                units = value / price;
                cash = 0.0;
                pending = false;
            }
            curve.push(*date, cash + units * last.unwrap_or(0.0));
        }

        tracing::debug!(
            symbol = %self.symbol,
            days = curve.len(),
            final_value = curve.last().map_or(0.0, |p| p.value),
            "benchmark replayed"
        );
        Ok(curve)
    }

    fn unavailable(&self, reason: String) -> BacktestError {
        tracing::warn!(symbol = %self.symbol, %reason, "benchmark unavailable");
        BacktestError::BenchmarkUnavailable {
            symbol: self.symbol.clone(),
            reason,
        }
    }
}
