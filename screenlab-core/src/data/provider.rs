//! Market data provider trait and structured error types.
//!
//! The `MarketDataProvider` trait abstracts over data sources (in-memory
//! tables, CSV import, a synthetic universe) so the engine can be pointed at
//! any of them and mocked in tests. Providers are read-only: the engine never
//! mutates what it is given.

use chrono::NaiveDate;
use thiserror::Error;

use super::window::DataWindow;
use crate::domain::PricePoint;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no data between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Read-only source of point-in-time prices and fundamentals.
///
/// Implementations must be shareable across threads: the batch runner hands
/// one provider to many concurrent runs.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (part of the run id).
    fn name(&self) -> &str;

    /// The investable universe, sorted by symbol. Index series are not part of it.
    fn instruments(&self) -> Vec<String>;

    /// Fully materialized prices and fundamentals for `symbols` over
    /// `[start, end]`. Fundamentals reported before `start` are included so
    /// that point-in-time lookups on the first day work.
    fn fetch_window(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataWindow, DataError>;

    /// Valid daily prints for one series (instrument or index) over `[start, end]`.
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError>;
}
