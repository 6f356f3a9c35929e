//! A fully materialized slice of market data for one backtest.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::align::align_prices;
use crate::domain::{FundamentalRecord, InstrumentSnapshot, PricePoint};

/// Prices on a shared trading calendar plus point-in-time fundamentals.
///
/// The calendar is the union of every symbol's valid print dates inside the
/// requested range. Price columns hold NaN on days a symbol did not print.
#[derive(Debug, Clone, Default)]
pub struct DataWindow {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    prices: HashMap<String, Vec<f64>>,
    /// Sorted ascending by `as_of`.
    fundamentals: HashMap<String, Vec<FundamentalRecord>>,
}

impl DataWindow {
    /// Build a window for `symbols`. Symbols without a price series get an
    /// all-NaN column; records are sorted by report date.
    pub fn from_parts(
        symbols: &[String],
        prices: HashMap<String, Vec<PricePoint>>,
        fundamentals: HashMap<String, Vec<FundamentalRecord>>,
    ) -> Self {
        let aligned = align_prices(&prices);
        let mut columns = aligned.closes;
        let n = aligned.dates.len();

        let mut syms: Vec<String> = symbols.to_vec();
        syms.sort();
        syms.dedup();
        for s in &syms {
            columns.entry(s.clone()).or_insert_with(|| vec![f64::NAN; n]);
        }

        let mut fundamentals = fundamentals;
        for records in fundamentals.values_mut() {
            records.sort_by_key(|r| r.as_of);
        }

        Self {
            dates: aligned.dates,
            symbols: syms,
            prices: columns,
            fundamentals,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// True if at least one symbol has one valid print.
    pub fn has_price_data(&self) -> bool {
        self.symbols.iter().any(|s| {
            self.prices
                .get(s)
                .map_or(false, |col| col.iter().any(|p| p.is_finite() && *p > 0.0))
        })
    }

    /// Index of the first trading day on or after `date`.
    pub fn first_index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.dates.partition_point(|d| *d < date);
        (idx < self.dates.len()).then_some(idx)
    }

    /// The print on trading day `idx`, if there was one.
    pub fn price_at(&self, symbol: &str, idx: usize) -> Option<f64> {
        self.prices
            .get(symbol)
            .and_then(|col| col.get(idx))
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    /// The most recent print on or before trading day `idx`.
    pub fn last_known_price(&self, symbol: &str, idx: usize) -> Option<f64> {
        let col = self.prices.get(symbol)?;
        let end = idx.min(col.len().checked_sub(1)?);
        col[..=end]
            .iter()
            .rev()
            .copied()
            .find(|p| p.is_finite() && *p > 0.0)
    }

    /// Latest fundamentals record reported on or before `date`.
    pub fn fundamentals_as_of(&self, symbol: &str, date: NaiveDate) -> Option<&FundamentalRecord> {
        let records = self.fundamentals.get(symbol)?;
        let idx = records.partition_point(|r| r.as_of <= date);
        idx.checked_sub(1).map(|i| &records[i])
    }

    /// What the screen sees for one symbol on trading day `idx`.
    ///
    /// The price is that day's print only: an instrument that did not trade
    /// cannot be bought.
    pub fn snapshot(&self, symbol: &str, idx: usize) -> Option<InstrumentSnapshot> {
        let date = *self.dates.get(idx)?;
        Some(InstrumentSnapshot::new(
            symbol,
            date,
            self.price_at(symbol, idx),
            self.fundamentals_as_of(symbol, date),
        ))
    }

    /// Snapshots for every symbol on trading day `idx`, in symbol order.
    pub fn snapshots(&self, idx: usize) -> Vec<InstrumentSnapshot> {
        self.symbols
            .iter()
            .filter_map(|s| self.snapshot(s, idx))
            .collect()
    }
}
