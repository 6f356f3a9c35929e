//! Threshold screening of the universe on a rebalance date.

use rayon::prelude::*;

use crate::config::{Configuration, FilterThresholds};
use crate::domain::{Factor, InstrumentSnapshot};

/// Keeps the instruments that satisfy every active threshold and carry every
/// field the rest of the pipeline will read.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseFilter {
    thresholds: FilterThresholds,
    required: Vec<Factor>,
}

impl UniverseFilter {
    /// `required` lists fields an instrument must have; price is always added.
    pub fn new(thresholds: FilterThresholds, required: &[Factor]) -> Self {
        let mut required: Vec<Factor> = required.to_vec();
        required.push(Factor::Price);
        required.extend(thresholds.required_factors());
        required.sort();
        required.dedup();
        Self {
            thresholds,
            required,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.filters, &config.required_factors())
    }

    pub fn required(&self) -> &[Factor] {
        &self.required
    }

    pub fn passes(&self, snap: &InstrumentSnapshot) -> bool {
        if !self.required.iter().all(|f| snap.has(*f)) {
            return false;
        }
        let t = &self.thresholds;
        let at_least = |value: Option<f64>, min: Option<f64>| match (value, min) {
            (_, None) => true,
            (Some(v), Some(m)) => v >= m,
            (None, Some(_)) => false,
        };
        let at_most = |value: Option<f64>, max: Option<f64>| match (value, max) {
            (_, None) => true,
            (Some(v), Some(m)) => v <= m,
            (None, Some(_)) => false,
        };
        at_least(snap.market_cap, t.market_cap_min)
            && at_most(snap.market_cap, t.market_cap_max)
            && at_least(snap.roce, t.roce_min)
            && at_least(snap.pat, t.pat_min)
    }

    /// Eligible snapshots, in input order. Evaluated in parallel.
    pub fn eligible(&self, snapshots: &[InstrumentSnapshot]) -> Vec<InstrumentSnapshot> {
        snapshots
            .par_iter()
            .filter(|s| self.passes(s))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FundamentalRecord;
    use chrono::NaiveDate;

    fn snap(
        symbol: &str,
        price: Option<f64>,
        mcap: Option<f64>,
        roce: Option<f64>,
        pat: Option<f64>,
    ) -> InstrumentSnapshot {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut rec = FundamentalRecord::new(symbol, date);
        rec.market_cap = mcap;
        rec.roce = roce;
        rec.pat = pat;
        InstrumentSnapshot::new(symbol, date, price, Some(&rec))
    }

    fn thresholds() -> FilterThresholds {
        FilterThresholds {
            market_cap_min: Some(1_000.0),
            market_cap_max: Some(50_000.0),
            roce_min: Some(15.0),
            pat_min: Some(0.0),
        }
    }

    #[test]
    fn all_thresholds_must_hold() {
        let f = UniverseFilter::new(thresholds(), &[]);
        assert!(f.passes(&snap("A", Some(10.0), Some(5_000.0), Some(20.0), Some(1.0))));
        assert!(!f.passes(&snap("B", Some(10.0), Some(500.0), Some(20.0), Some(1.0))));
        assert!(!f.passes(&snap("C", Some(10.0), Some(60_000.0), Some(20.0), Some(1.0))));
        assert!(!f.passes(&snap("D", Some(10.0), Some(5_000.0), Some(10.0), Some(1.0))));
        assert!(!f.passes(&snap("E", Some(10.0), Some(5_000.0), Some(20.0), Some(-1.0))));
    }

    #[test]
    fn bounds_are_inclusive() {
        let f = UniverseFilter::new(thresholds(), &[]);
        assert!(f.passes(&snap("A", Some(10.0), Some(1_000.0), Some(15.0), Some(0.0))));
        assert!(f.passes(&snap("A", Some(10.0), Some(50_000.0), Some(15.0), Some(0.0))));
    }

    #[test]
    fn missing_threshold_field_excludes() {
        let f = UniverseFilter::new(thresholds(), &[]);
        assert!(!f.passes(&snap("A", Some(10.0), None, Some(20.0), Some(1.0))));
    }

    #[test]
    fn missing_price_excludes_even_without_thresholds() {
        let f = UniverseFilter::new(FilterThresholds::none(), &[]);
        assert!(!f.passes(&snap("A", None, Some(5_000.0), None, None)));
        assert!(f.passes(&snap("A", Some(1.0), None, None, None)));
    }

    #[test]
    fn ranking_factor_is_required() {
        let f = UniverseFilter::new(FilterThresholds::none(), &[Factor::Roe]);
        assert!(!f.passes(&snap("A", Some(1.0), None, None, None)));
    }

    #[test]
    fn eligible_preserves_input_order() {
        let f = UniverseFilter::new(FilterThresholds::none(), &[]);
        let input: Vec<_> = (0..50)
            .map(|i| {
                let price = if i % 3 == 0 { None } else { Some(1.0) };
                snap(&format!("S{i:02}"), price, None, None, None)
            })
            .collect();
        let out = f.eligible(&input);
        let syms: Vec<&str> = out.iter().map(|s| s.symbol.as_str()).collect();
        let expected: Vec<String> = (0..50)
            .filter(|i| i % 3 != 0)
            .map(|i| format!("S{i:02}"))
            .collect();
        assert_eq!(syms, expected);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let f = UniverseFilter::new(thresholds(), &[]);
        assert!(f.eligible(&[snap("A", Some(1.0), Some(1.0), Some(1.0), Some(1.0))]).is_empty());
    }
}
