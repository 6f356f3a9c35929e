//! Multi-symbol time alignment.
//!
//! Given price series for multiple symbols, align them to a common calendar.
//! Missing or unusable prints become NaN; nothing is forward-filled here.
//! Carry-forward is a valuation rule applied by the simulation, not a data fix.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::domain::PricePoint;

/// Closes for multiple symbols on one shared calendar.
#[derive(Debug, Clone, Default)]
pub struct AlignedPrices {
    /// Union of every symbol's dates, sorted ascending.
    pub dates: Vec<NaiveDate>,
    /// One column per symbol, each the same length as `dates`.
    pub closes: HashMap<String, Vec<f64>>,
}

/// Align series to the union of their dates.
///
/// Only valid prints (finite, > 0) contribute dates to the calendar.
pub fn align_prices(series: &HashMap<String, Vec<PricePoint>>) -> AlignedPrices {
    let dates: Vec<NaiveDate> = series
        .values()
        .flatten()
        .filter(|p| p.is_valid())
        .map(|p| p.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let closes = series
        .iter()
        .map(|(symbol, points)| {
            let by_date: HashMap<NaiveDate, f64> = points
                .iter()
                .filter(|p| p.is_valid())
                .map(|p| (p.date, p.close))
                .collect();
            let column = dates
                .iter()
                .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                .collect();
            (symbol.clone(), column)
        })
        .collect();

    AlignedPrices { dates, closes }
}
