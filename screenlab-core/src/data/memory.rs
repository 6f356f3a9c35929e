//! In-memory market data provider.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::provider::{DataError, MarketDataProvider};
use super::window::DataWindow;
use crate::domain::{FundamentalRecord, PricePoint};

/// Price and fundamentals tables held in memory.
///
/// Index series (benchmarks) live in their own table so they never enter the
/// investable universe.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    name: String,
    prices: BTreeMap<String, Vec<PricePoint>>,
    fundamentals: BTreeMap<String, Vec<FundamentalRecord>>,
    indices: BTreeMap<String, Vec<PricePoint>>,
}

impl InMemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replace a symbol's price series. Points are sorted by date; for
    /// duplicate dates the last one wins.
    pub fn insert_price_series(
        &mut self,
        symbol: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> &mut Self {
        self.prices.insert(symbol.into(), normalize(points));
        self
    }

    pub fn push_fundamental(&mut self, record: FundamentalRecord) -> &mut Self {
        let records = self.fundamentals.entry(record.symbol.clone()).or_default();
        records.push(record);
        records.sort_by_key(|r| r.as_of);
        self
    }

    pub fn insert_index(
        &mut self,
        symbol: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> &mut Self {
        self.indices.insert(symbol.into(), normalize(points));
        self
    }

    /// Move an instrument's price series into the index table.
    pub fn promote_to_index(&mut self, symbol: &str) -> bool {
        match self.prices.remove(symbol) {
            Some(points) => {
                self.fundamentals.remove(symbol);
                self.indices.insert(symbol.to_string(), points);
                true
            }
            None => false,
        }
    }

    pub fn index_symbols(&self) -> Vec<String> {
        self.indices.keys().cloned().collect()
    }
}

fn normalize(points: Vec<PricePoint>) -> Vec<PricePoint> {
    let by_date: BTreeMap<NaiveDate, PricePoint> =
        points.into_iter().map(|p| (p.date, p)).collect();
    by_date.into_values().collect()
}

fn in_range(points: &[PricePoint], start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
    points
        .iter()
        .filter(|p| p.date >= start && p.date <= end && p.is_valid())
        .copied()
        .collect()
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn instruments(&self) -> Vec<String> {
        self.prices
            .keys()
            .chain(self.fundamentals.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn fetch_window(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataWindow, DataError> {
        let mut prices = HashMap::new();
        let mut fundamentals = HashMap::new();
        for symbol in symbols {
            let series = self.prices.get(symbol);
            let records = self.fundamentals.get(symbol);
            if series.is_none() && records.is_none() {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.clone(),
                });
            }
            if let Some(series) = series {
                prices.insert(symbol.clone(), in_range(series, start, end));
            }
            if let Some(records) = records {
                let known: Vec<FundamentalRecord> =
                    records.iter().filter(|r| r.as_of <= end).cloned().collect();
                fundamentals.insert(symbol.clone(), known);
            }
        }

        let window = DataWindow::from_parts(symbols, prices, fundamentals);
        if window.is_empty() {
            return Err(DataError::NoData { start, end });
        }
        Ok(window)
    }

    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError> {
        let series = self
            .indices
            .get(symbol)
            .or_else(|| self.prices.get(symbol))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let points = in_range(series, start, end);
        if points.is_empty() {
            return Err(DataError::NoData { start, end });
        }
        Ok(points)
    }
}
