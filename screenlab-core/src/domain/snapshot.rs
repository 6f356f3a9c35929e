//! Point-in-time instrument data: prices, fundamentals, and the per-date snapshot
//! the screening pipeline works on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A screening/ranking/sizing factor read from an [`InstrumentSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    MarketCap,
    Roce,
    Roe,
    Pe,
    Pat,
    Price,
}

impl Factor {
    pub const ALL: [Factor; 6] = [
        Factor::MarketCap,
        Factor::Roce,
        Factor::Roe,
        Factor::Pe,
        Factor::Pat,
        Factor::Price,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::MarketCap => "market_cap",
            Factor::Roce => "roce",
            Factor::Roe => "roe",
            Factor::Pe => "pe",
            Factor::Pat => "pat",
            Factor::Price => "price",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Factor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market_cap" | "marketcap" | "mcap" => Ok(Factor::MarketCap),
            "roce" => Ok(Factor::Roce),
            "roe" => Ok(Factor::Roe),
            "pe" | "p/e" => Ok(Factor::Pe),
            "pat" => Ok(Factor::Pat),
            "price" | "close" => Ok(Factor::Price),
            other => Err(ParseError::UnknownFactor(other.to_string())),
        }
    }
}

/// One daily price print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// A print is usable only if it is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// A fundamentals report, effective from `as_of` until superseded by a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    pub symbol: String,
    pub as_of: NaiveDate,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub roce: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub pat: Option<f64>,
}

impl FundamentalRecord {
    /// Empty record: every field missing.
    pub fn new(symbol: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            as_of,
            market_cap: None,
            roce: None,
            roe: None,
            pe: None,
            pat: None,
        }
    }

    pub fn with(mut self, factor: Factor, value: f64) -> Self {
        match factor {
            Factor::MarketCap => self.market_cap = Some(value),
            Factor::Roce => self.roce = Some(value),
            Factor::Roe => self.roe = Some(value),
            Factor::Pe => self.pe = Some(value),
            Factor::Pat => self.pat = Some(value),
            // Prices come from the price series, never from a report.
            Factor::Price => {}
        }
        self
    }
}

/// Everything the engine knows about one instrument on one date.
///
/// Missing data stays `None`; nothing is defaulted. NaN values coming from
/// upstream are normalized to `None` by [`InstrumentSnapshot::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub roce: Option<f64>,
    pub roe: Option<f64>,
    pub pe: Option<f64>,
    pub pat: Option<f64>,
}

impl InstrumentSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        price: Option<f64>,
        fundamentals: Option<&FundamentalRecord>,
    ) -> Self {
        let f = fundamentals;
        Self {
            symbol: symbol.into(),
            date,
            price: finite(price).filter(|p| *p > 0.0),
            market_cap: finite(f.and_then(|r| r.market_cap)),
            roce: finite(f.and_then(|r| r.roce)),
            roe: finite(f.and_then(|r| r.roe)),
            pe: finite(f.and_then(|r| r.pe)),
            pat: finite(f.and_then(|r| r.pat)),
        }
    }

    pub fn factor(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::MarketCap => self.market_cap,
            Factor::Roce => self.roce,
            Factor::Roe => self.roe,
            Factor::Pe => self.pe,
            Factor::Pat => self.pat,
            Factor::Price => self.price,
        }
    }

    pub fn has(&self, factor: Factor) -> bool {
        self.factor(factor).is_some()
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn factor_parses_aliases() {
        assert_eq!("ROCE".parse::<Factor>().unwrap(), Factor::Roce);
        assert_eq!("marketcap".parse::<Factor>().unwrap(), Factor::MarketCap);
        assert_eq!(" pe ".parse::<Factor>().unwrap(), Factor::Pe);
        assert!("ebitda".parse::<Factor>().is_err());
    }

    #[test]
    fn factor_display_roundtrips() {
        for f in Factor::ALL {
            assert_eq!(f.to_string().parse::<Factor>().unwrap(), f);
        }
    }

    #[test]
    fn snapshot_normalizes_nan_and_nonpositive_price() {
        let rec = FundamentalRecord::new("TCS", d("2023-01-01"))
            .with(Factor::Roce, f64::NAN)
            .with(Factor::Roe, 30.0);
        let snap = InstrumentSnapshot::new("TCS", d("2023-01-02"), Some(0.0), Some(&rec));
        assert_eq!(snap.price, None);
        assert_eq!(snap.roce, None);
        assert_eq!(snap.roe, Some(30.0));
        assert!(!snap.has(Factor::MarketCap));
    }

    #[test]
    fn snapshot_without_fundamentals_has_only_price() {
        let snap = InstrumentSnapshot::new("INFY", d("2023-01-02"), Some(1500.0), None);
        assert_eq!(snap.factor(Factor::Price), Some(1500.0));
        for f in [Factor::MarketCap, Factor::Roce, Factor::Roe, Factor::Pe, Factor::Pat] {
            assert!(!snap.has(f));
        }
    }

    #[test]
    fn price_point_validity() {
        assert!(PricePoint::new(d("2023-01-02"), 10.0).is_valid());
        assert!(!PricePoint::new(d("2023-01-02"), f64::NAN).is_valid());
        assert!(!PricePoint::new(d("2023-01-02"), -1.0).is_valid());
    }
}
