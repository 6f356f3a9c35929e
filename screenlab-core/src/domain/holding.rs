//! Holdings and per-rebalance records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Weight tolerance used for "weights sum to one" checks.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// A target weight for one instrument, produced by the position sizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWeight {
    pub symbol: String,
    pub weight: f64,
}

/// A position held between two rebalance dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    /// Fraction of portfolio value allocated at the rebalance, in [0, 1].
    pub weight: f64,
    /// Units bought: weight × portfolio value / entry price.
    pub units: f64,
    pub entry_price: f64,
}

impl Holding {
    pub fn open(symbol: impl Into<String>, weight: f64, portfolio_value: f64, price: f64) -> Self {
        let units = if price > 0.0 {
            weight * portfolio_value / price
        } else {
            0.0
        };
        Self {
            symbol: symbol.into(),
            weight,
            units,
            entry_price: price,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.units * price
    }
}

/// What happened at one rebalance date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebalance {
    pub date: NaiveDate,
    /// Instruments that passed the filter.
    pub eligible_count: usize,
    /// Portfolio value at liquidation, which is also the value deployed.
    pub portfolio_value: f64,
    /// Empty when the eligible set was empty (all-cash period).
    pub holdings: Vec<Holding>,
    /// True when the sizer fell back to equal weights.
    pub equal_weight_fallback: bool,
}

impl Rebalance {
    pub fn weight_sum(&self) -> f64 {
        self.holdings.iter().map(|h| h.weight).sum()
    }

    pub fn is_cash(&self) -> bool {
        self.holdings.is_empty()
    }
}
