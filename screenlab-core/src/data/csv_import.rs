//! CSV import for price and fundamentals tables.
//!
//! Prices are long format: `date,symbol,close`. Fundamentals carry one report
//! per row: `symbol,date,market_cap,roce,roe,pe,pat`, where `year` may stand
//! in for `date` (the report is then effective from January 1st). Empty cells
//! mean the value is missing.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::memory::InMemoryProvider;
use super::provider::{DataError, MarketDataProvider};
use crate::domain::{FundamentalRecord, PricePoint};

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    symbol: String,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct FundamentalRow {
    symbol: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    roce: Option<f64>,
    #[serde(default)]
    roe: Option<f64>,
    #[serde(default)]
    pe: Option<f64>,
    #[serde(default)]
    pat: Option<f64>,
}

impl FundamentalRow {
    fn into_record(self, line: usize) -> Result<FundamentalRecord, DataError> {
        let as_of = match (self.date, self.year) {
            (Some(date), _) => date,
            (None, Some(year)) => NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| DataError::Parse(format!("row {line}: bad year {year}")))?,
            (None, None) => {
                return Err(DataError::Parse(format!(
                    "row {line}: fundamentals for '{}' need a date or year",
                    self.symbol
                )))
            }
        };
        Ok(FundamentalRecord {
            symbol: self.symbol,
            as_of,
            market_cap: self.market_cap,
            roce: self.roce,
            roe: self.roe,
            pe: self.pe,
            pat: self.pat,
        })
    }
}

/// Read long-format prices, grouped by symbol.
pub fn read_prices<R: Read>(reader: R) -> Result<BTreeMap<String, Vec<PricePoint>>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
    for row in rdr.deserialize() {
        let row: PriceRow = row?;
        out.entry(row.symbol)
            .or_default()
            .push(PricePoint::new(row.date, row.close));
    }
    Ok(out)
}

pub fn read_fundamentals<R: Read>(reader: R) -> Result<Vec<FundamentalRecord>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| {
            let row: FundamentalRow = row?;
            row.into_record(i + 2)
        })
        .collect()
}

pub fn load_prices(path: &Path) -> Result<BTreeMap<String, Vec<PricePoint>>, DataError> {
    read_prices(File::open(path)?)
}

pub fn load_fundamentals(path: &Path) -> Result<Vec<FundamentalRecord>, DataError> {
    read_fundamentals(File::open(path)?)
}

impl InMemoryProvider {
    /// Build a provider from CSV files.
    ///
    /// Symbols listed in `index_symbols` are taken out of the universe and
    /// served only through `fetch_prices`.
    pub fn from_csv(
        name: impl Into<String>,
        prices: &Path,
        fundamentals: Option<&Path>,
        index_symbols: &[String],
    ) -> Result<Self, DataError> {
        let mut provider = Self::new(name);
        for (symbol, points) in load_prices(prices)? {
            provider.insert_price_series(symbol, points);
        }
        if let Some(path) = fundamentals {
            for record in load_fundamentals(path)? {
                provider.push_fundamental(record);
            }
        }
        for symbol in index_symbols {
            if !provider.promote_to_index(symbol) {
                tracing::warn!(symbol = %symbol, "index symbol has no price series in csv");
            }
        }
        tracing::debug!(
            instruments = provider.instruments().len(),
            indices = provider.index_symbols().len(),
            "loaded market data from csv"
        );
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reads_long_format_prices() {
        let csv = "date,symbol,close\n\
                   2023-01-02,TCS,3300.5\n\
                   2023-01-02,INFY,1500\n\
                   2023-01-03,TCS,3310\n";
        let prices = read_prices(csv.as_bytes()).unwrap();
        assert_eq!(prices["TCS"].len(), 2);
        assert_eq!(prices["INFY"][0].close, 1500.0);
    }

    #[test]
    fn empty_cells_are_missing_and_year_maps_to_jan_first() {
        let csv = "symbol,year,market_cap,roce,roe,pe,pat\nTCS,2022,1200000,45.1,,28.5,\n";
        let records = read_fundamentals(csv.as_bytes()).unwrap();
        let r = &records[0];
        assert_eq!(r.as_of, d("2022-01-01"));
        assert_eq!(r.roce, Some(45.1));
        assert_eq!(r.roe, None);
        assert_eq!(r.pat, None);
    }

    #[test]
    fn explicit_date_column() {
        let csv = "symbol,date,roe\nTCS,2023-04-15,31\n";
        let records = read_fundamentals(csv.as_bytes()).unwrap();
        assert_eq!(records[0].as_of, d("2023-04-15"));
        assert_eq!(records[0].market_cap, None);
    }

    #[test]
    fn row_without_date_or_year_is_rejected() {
        let csv = "symbol,roe\nTCS,31\n";
        assert!(matches!(
            read_fundamentals(csv.as_bytes()),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn malformed_price_is_csv_error() {
        let csv = "date,symbol,close\n2023-01-02,TCS,abc\n";
        assert!(matches!(read_prices(csv.as_bytes()), Err(DataError::Csv(_))));
    }

    #[test]
    fn from_csv_separates_index() {
        let dir = std::env::temp_dir().join(format!("screenlab-csv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prices.csv");
        std::fs::write(
            &path,
            "date,symbol,close\n2023-01-02,TCS,10\n2023-01-02,NIFTY,18000\n",
        )
        .unwrap();
        let fundamentals = dir.join("fundamentals.csv");
        std::fs::write(&fundamentals, "symbol,year,roe\nTCS,2022,31\nNIFTY,2022,0\n").unwrap();
        let indices = ["NIFTY".to_string(), "SENSEX".to_string()];
        let p = InMemoryProvider::from_csv("csv", &path, Some(&fundamentals), &indices).unwrap();
        assert_eq!(p.instruments(), vec!["TCS"]);
        assert_eq!(p.index_symbols(), vec!["NIFTY"]);
        assert_eq!(
            p.fetch_prices("NIFTY", d("2023-01-01"), d("2023-01-31")).unwrap()[0].close,
            18000.0
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
