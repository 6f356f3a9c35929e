//! Target weights for the selected instruments.

use crate::config::SizingMode;
use crate::domain::{InstrumentSnapshot, TargetWeight};
use crate::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSizer {
    pub mode: SizingMode,
}

impl PositionSizer {
    pub fn new(mode: SizingMode) -> Self {
        Self { mode }
    }

    /// Weights in selection order, summing to 1. Empty selection, no weights.
    ///
    /// Proportional modes use the positive part of the sizing value; if no
    /// candidate has a positive value the weighting is degenerate.
    pub fn weights(
        &self,
        selected: &[InstrumentSnapshot],
    ) -> Result<Vec<TargetWeight>, BacktestError> {
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        let Some(factor) = self.mode.factor() else {
            return Ok(equal_weights(selected));
        };

        let raw: Vec<f64> = selected
            .iter()
            .map(|s| s.factor(factor).filter(|v| *v > 0.0).unwrap_or(0.0))
            .collect();
        let total: f64 = raw.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(BacktestError::DegenerateWeight {
                factor: factor.to_string(),
            });
        }
        Ok(selected
            .iter()
            .zip(raw)
            .map(|(s, v)| TargetWeight {
                symbol: s.symbol.clone(),
                weight: v / total,
            })
            .collect())
    }

    /// [`weights`](Self::weights) with the equal-weight recovery applied.
    /// The flag reports whether the recovery was needed.
    pub fn weights_or_equal(&self, selected: &[InstrumentSnapshot]) -> (Vec<TargetWeight>, bool) {
        match self.weights(selected) {
            Ok(w) => (w, false),
            Err(_) => (equal_weights(selected), true),
        }
    }
}

fn equal_weights(selected: &[InstrumentSnapshot]) -> Vec<TargetWeight> {
    let w = 1.0 / selected.len() as f64;
    selected
        .iter()
        .map(|s| TargetWeight {
            symbol: s.symbol.clone(),
            weight: w,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Factor, FundamentalRecord, WEIGHT_TOLERANCE};
    use chrono::NaiveDate;

    fn snap(symbol: &str, factor: Factor, value: f64) -> InstrumentSnapshot {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let rec = FundamentalRecord::new(symbol, date).with(factor, value);
        InstrumentSnapshot::new(symbol, date, Some(10.0), Some(&rec))
    }

    fn sum(w: &[TargetWeight]) -> f64 {
        w.iter().map(|t| t.weight).sum()
    }

    #[test]
    fn equal_weights_split_evenly() {
        let sel = vec![
            snap("A", Factor::Roe, 1.0),
            snap("B", Factor::Roe, 2.0),
            snap("C", Factor::Roe, 3.0),
        ];
        let w = PositionSizer::new(SizingMode::Equal).weights(&sel).unwrap();
        assert!(w.iter().all(|t| (t.weight - 1.0 / 3.0).abs() < 1e-12));
        assert!((sum(&w) - 1.0).abs() < WEIGHT_TOLERANCE);
    }

    #[test]
    fn market_cap_proportional() {
        let sel = vec![snap("A", Factor::MarketCap, 300.0), snap("B", Factor::MarketCap, 100.0)];
        let w = PositionSizer::new(SizingMode::MarketCap).weights(&sel).unwrap();
        assert!((w[0].weight - 0.75).abs() < 1e-12);
        assert!((w[1].weight - 0.25).abs() < 1e-12);
    }

    #[test]
    fn negative_factor_values_get_zero_weight() {
        let sel = vec![
            snap("A", Factor::Roce, 30.0),
            snap("B", Factor::Roce, -10.0),
            snap("C", Factor::Roce, 10.0),
        ];
        let w = PositionSizer::new(SizingMode::Factor(Factor::Roce)).weights(&sel).unwrap();
        assert!((w[0].weight - 0.75).abs() < 1e-12);
        assert_eq!(w[1].weight, 0.0);
        assert!((w[2].weight - 0.25).abs() < 1e-12);
        assert!((sum(&w) - 1.0).abs() < WEIGHT_TOLERANCE);
    }

    #[test]
    fn all_negative_is_degenerate_and_falls_back() {
        let sel = vec![
            snap("A", Factor::Roce, -1.0),
            snap("B", Factor::Roce, -2.0),
            snap("C", Factor::Roce, -3.0),
        ];
        let sizer = PositionSizer::new(SizingMode::Factor(Factor::Roce));
        assert_eq!(
            sizer.weights(&sel),
            Err(BacktestError::DegenerateWeight { factor: "roce".into() })
        );
        let (w, fallback) = sizer.weights_or_equal(&sel);
        assert!(fallback);
        assert!(w.iter().all(|t| (t.weight - 1.0 / 3.0).abs() < 1e-12));
    }

    #[test]
    fn empty_selection_has_no_weights() {
        let sizer = PositionSizer::new(SizingMode::MarketCap);
        assert_eq!(sizer.weights(&[]), Ok(vec![]));
        assert_eq!(sizer.weights_or_equal(&[]), (vec![], false));
    }
}
