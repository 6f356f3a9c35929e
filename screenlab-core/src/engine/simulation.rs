//! The daily simulation loop.
//!
//! On each rebalance day the whole book is liquidated at that day's prices,
//! then re-built through filter → rank → size. Every trading day the book is
//! marked to market and appended to the equity curve. Instruments without a
//! print on a given day are valued at their last known price.
//!
//! A `Simulation` moves `Uninitialized → Running → Completed` (or `Failed`)
//! exactly once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::filter::UniverseFilter;
use super::ranking::RankingEngine;
use super::schedule::RebalanceScheduler;
use super::sizing::PositionSizer;
use crate::config::Configuration;
use crate::data::{DataError, DataWindow, MarketDataProvider};
use crate::domain::{
    EquityCurve, Holding, InstrumentSnapshot, Rebalance, SimulationWarning, WarningKind,
};
use crate::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationState {
    Uninitialized,
    Running,
    Completed,
    Failed,
}

/// Everything a completed simulation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub equity_curve: EquityCurve,
    pub rebalances: Vec<Rebalance>,
    pub warnings: Vec<SimulationWarning>,
}

#[derive(Debug)]
pub struct Simulation {
    config: Configuration,
    state: SimulationState,
    scheduler: RebalanceScheduler,
    filter: UniverseFilter,
    ranking: RankingEngine,
    sizer: PositionSizer,
}

impl Simulation {
    /// Validates the configuration; an invalid one never becomes a simulation.
    pub fn new(config: Configuration) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self {
            scheduler: RebalanceScheduler::new(config.frequency),
            filter: UniverseFilter::from_config(&config),
            ranking: RankingEngine::from_config(&config),
            sizer: PositionSizer::new(config.sizing),
            state: SimulationState::Uninitialized,
            config,
        })
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Fetch the data window from `provider` and simulate over it.
    ///
    /// A portfolio larger than the provider's universe is a configuration
    /// error and leaves the simulation `Uninitialized`.
    pub fn run(
        &mut self,
        provider: &dyn MarketDataProvider,
    ) -> Result<SimulationOutput, BacktestError> {
        let universe = provider.instruments();
        self.config.validate_universe(universe.len())?;
        self.begin()?;
        let result = self
            .fetch(provider, &universe)
            .and_then(|window| self.simulate(&window));
        self.finish(result)
    }

    /// Simulate over an already materialized window.
    pub fn run_on_window(
        &mut self,
        window: &DataWindow,
    ) -> Result<SimulationOutput, BacktestError> {
        self.config.validate_universe(window.symbols().len())?;
        self.begin()?;
        let result = self.simulate(window);
        self.finish(result)
    }

    fn begin(&mut self) -> Result<(), BacktestError> {
        if self.state != SimulationState::Uninitialized {
            return Err(BacktestError::InvalidState(self.state));
        }
        self.state = SimulationState::Running;
        Ok(())
    }

    fn finish(
        &mut self,
        result: Result<SimulationOutput, BacktestError>,
    ) -> Result<SimulationOutput, BacktestError> {
        self.state = match &result {
            Ok(_) => SimulationState::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "simulation failed");
                SimulationState::Failed
            }
        };
        result
    }

    fn fetch(
        &self,
        provider: &dyn MarketDataProvider,
        universe: &[String],
    ) -> Result<DataWindow, BacktestError> {
        let (start, end) = (self.config.start_date, self.config.end_date);
        provider
            .fetch_window(universe, start, end)
            .map_err(|e| data_unavailable(e, provider.name(), start, end))
    }

    fn simulate(&self, window: &DataWindow) -> Result<SimulationOutput, BacktestError> {
        let (start, end) = (self.config.start_date, self.config.end_date);
        let dates = window.dates();
        let first = dates.partition_point(|d| *d < start);
        let last = dates.partition_point(|d| *d <= end);
        if first >= last || !window.has_price_data() {
            return Err(BacktestError::DataUnavailable {
                start,
                end,
                reason: "no trading day with a valid price in range".to_string(),
            });
        }

        let schedule = self.scheduler.trading_schedule(start, end, dates)?;
        let mut next_rebalance = schedule.iter().copied().peekable();

        let mut book = Book::new(self.config.initial_capital);
        let mut curve = EquityCurve::with_capacity(last - first);
        let mut rebalances = Vec::with_capacity(schedule.len());
        let mut warnings = Vec::new();

        for t in first..last {
            let date = dates[t];
            if next_rebalance.peek() == Some(&t) {
                next_rebalance.next();
                let value = book.liquidate(window, t, &mut warnings);
                let record = self.rebalance(window, t, date, value, &mut book, &mut warnings);
                tracing::debug!(
                    %date,
                    eligible = record.eligible_count,
                    held = record.holdings.len(),
                    value = record.portfolio_value,
                    "rebalanced"
                );
                rebalances.push(record);
            }
            curve.push(date, book.mark(window, t, &mut warnings));
        }

        for (symbol, days) in &book.carried {
            warnings.push(emit(
                SimulationWarning::new(
                    WarningKind::CarryForward,
                    format!("valued at last known price on {days} day(s) without a print"),
                )
                .for_symbol(symbol.clone()),
            ));
        }

        tracing::debug!(
            days = curve.len(),
            rebalances = rebalances.len(),
            warnings = warnings.len(),
            final_value = curve.last().map_or(0.0, |p| p.value),
            "simulation completed"
        );

        Ok(SimulationOutput {
            equity_curve: curve,
            rebalances,
            warnings,
        })
    }

    /// Filter → rank → size, then acquire the new book.
    fn rebalance(
        &self,
        window: &DataWindow,
        t: usize,
        date: NaiveDate,
        value: f64,
        book: &mut Book,
        warnings: &mut Vec<SimulationWarning>,
    ) -> Rebalance {
        let eligible = self.filter.eligible(&window.snapshots(t));
        let selected: Vec<InstrumentSnapshot> = match self.ranking.rank_non_empty(&eligible, date) {
            Ok(ranked) => ranked.into_iter().map(|c| c.snapshot).collect(),
            Err(e) => {
                warnings.push(emit(
                    SimulationWarning::new(WarningKind::EmptyUniverse, format!("{e}; holding cash"))
                        .on(date),
                ));
                Vec::new()
            }
        };

        let (weights, fallback) = self.sizer.weights_or_equal(&selected);
        if fallback {
            warnings.push(emit(
                SimulationWarning::new(
                    WarningKind::DegenerateWeight,
                    format!(
                        "no selected instrument has a positive {} value; using equal weights",
                        self.sizer
                            .mode
                            .factor()
                            .map_or_else(|| "sizing".to_string(), |f| f.to_string())
                    ),
                )
                .on(date),
            ));
        }

        let holdings: Vec<Holding> = weights
            .iter()
            .zip(&selected)
            .filter(|(w, _)| w.weight > 0.0)
            .filter_map(|(w, snap)| {
                snap.price
                    .map(|price| Holding::open(w.symbol.clone(), w.weight, value, price))
            })
            .collect();
        book.acquire(value, &holdings);

        Rebalance {
            date,
            eligible_count: eligible.len(),
            portfolio_value: value,
            holdings,
            equal_weight_fallback: fallback,
        }
    }
}

/// Run a fresh simulation of `config` against `provider`.
pub fn run_simulation(
    config: Configuration,
    provider: &dyn MarketDataProvider,
) -> Result<SimulationOutput, BacktestError> {
    Simulation::new(config)?.run(provider)
}

fn data_unavailable(
    err: DataError,
    provider: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> BacktestError {
    tracing::warn!(provider, error = %err, "market data unavailable");
    BacktestError::DataUnavailable {
        start,
        end,
        reason: format!("{provider}: {err}"),
    }
}

fn emit(warning: SimulationWarning) -> SimulationWarning {
    tracing::warn!(
        kind = ?warning.kind,
        date = ?warning.date,
        symbol = warning.symbol.as_deref().unwrap_or(""),
        "{}",
        warning.message
    );
    warning
}

/// Cash plus the current holdings, with carry-forward bookkeeping.
struct Book {
    cash: f64,
    holdings: Vec<Holding>,
    /// Days each symbol was valued at a carried price.
    carried: BTreeMap<String, usize>,
    /// Symbols already reported as having no price at all this period.
    unpriced: BTreeSet<String>,
}

impl Book {
    fn new(cash: f64) -> Self {
        Self {
            cash,
            holdings: Vec::new(),
            carried: BTreeMap::new(),
            unpriced: BTreeSet::new(),
        }
    }

    /// Sell everything at day `t` prices. Returns the resulting cash.
    fn liquidate(
        &mut self,
        window: &DataWindow,
        t: usize,
        warnings: &mut Vec<SimulationWarning>,
    ) -> f64 {
        let value = self.value_at(window, t, warnings, false);
        self.cash = value;
        self.holdings.clear();
        self.unpriced.clear();
        value
    }

    fn acquire(&mut self, value: f64, holdings: &[Holding]) {
        let invested: f64 = holdings.iter().map(|h| h.weight).sum::<f64>() * value;
        self.cash = if holdings.is_empty() {
            value
        } else {
            (value - invested).max(0.0)
        };
        self.holdings = holdings.to_vec();
    }

    fn mark(
        &mut self,
        window: &DataWindow,
        t: usize,
        warnings: &mut Vec<SimulationWarning>,
    ) -> f64 {
        self.value_at(window, t, warnings, true)
    }

    fn value_at(
        &mut self,
        window: &DataWindow,
        t: usize,
        warnings: &mut Vec<SimulationWarning>,
        count_carry: bool,
    ) -> f64 {
        let mut total = self.cash;
        for h in &self.holdings {
            let price = match window.price_at(&h.symbol, t) {
                Some(p) => Some(p),
                None => {
                    let carried = window.last_known_price(&h.symbol, t);
                    if carried.is_some() && count_carry {
                        *self.carried.entry(h.symbol.clone()).or_default() += 1;
                    }
                    carried
                }
            };
            match price {
                Some(p) => total += h.market_value(p),
                // Holdings open only on a same-day print, so a prior price
                // always exists; this arm guards a broken window invariant.
                None => {
                    if self.unpriced.insert(h.symbol.clone()) {
                        let mut w = SimulationWarning::new(
                            WarningKind::MissingPrice,
                            "no price available; valued at zero",
                        )
                        .for_symbol(h.symbol.clone());
                        if let Some(d) = window.dates().get(t) {
                            w = w.on(*d);
                        }
                        warnings.push(emit(w));
                    }
                }
            }
        }
        total
    }
}
