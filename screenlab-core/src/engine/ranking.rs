//! Ordering of eligible candidates.
//!
//! Every criterion becomes a percentile score in (0, 1] across the eligible
//! set, with ties sharing their average rank. Scores are summed with equal
//! weight. With one criterion this reproduces a plain sort on that factor, so
//! single-factor and composite ranking run through the same code.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::{Configuration, Direction, RankCriterion};
use crate::domain::InstrumentSnapshot;
use crate::error::BacktestError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub snapshot: InstrumentSnapshot,
    /// Sum of per-criterion percentile scores; higher is better.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingEngine {
    criteria: Vec<RankCriterion>,
    portfolio_size: usize,
}

impl RankingEngine {
    pub fn new(criteria: Vec<RankCriterion>, portfolio_size: usize) -> Self {
        Self {
            criteria,
            portfolio_size,
        }
    }

    /// Uses the configuration's effective criteria (first only unless composite).
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.effective_criteria().to_vec(), config.portfolio_size)
    }

    pub fn criteria(&self) -> &[RankCriterion] {
        &self.criteria
    }

    /// Best `portfolio_size` candidates, best first. Empty in, empty out.
    pub fn rank(&self, eligible: &[InstrumentSnapshot]) -> Vec<RankedCandidate> {
        let n = eligible.len();
        let mut scores = vec![0.0_f64; n];
        for criterion in &self.criteria {
            for (total, s) in scores.iter_mut().zip(percentile_scores(eligible, criterion)) {
                *total += s;
            }
        }

        let mut ranked: Vec<RankedCandidate> = eligible
            .iter()
            .zip(scores)
            .map(|(snap, score)| RankedCandidate {
                snapshot: snap.clone(),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.snapshot.symbol.cmp(&b.snapshot.symbol))
        });
        ranked.truncate(self.portfolio_size);
        ranked
    }

    /// Like [`rank`](Self::rank), but an empty eligible set is an error.
    pub fn rank_non_empty(
        &self,
        eligible: &[InstrumentSnapshot],
        date: NaiveDate,
    ) -> Result<Vec<RankedCandidate>, BacktestError> {
        if eligible.is_empty() {
            return Err(BacktestError::EmptyUniverse { date });
        }
        Ok(self.rank(eligible))
    }
}

/// Percentile of each candidate under one criterion: average rank / n, where
/// the best value by the criterion's direction gets rank n. Missing values
/// score 0.
fn percentile_scores(snaps: &[InstrumentSnapshot], criterion: &RankCriterion) -> Vec<f64> {
    let keyed: Vec<(usize, f64)> = snaps
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            s.factor(criterion.factor).map(|v| match criterion.direction {
                Direction::Descending => (i, v),
                Direction::Ascending => (i, -v),
            })
        })
        .collect();

    let mut order = keyed;
    order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let n = snaps.len() as f64;
    let mut scores = vec![0.0; snaps.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && order[j + 1].1 == order[i].1 {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares their mean.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for (idx, _) in &order[i..=j] {
            scores[*idx] = avg_rank / n;
        }
        i = j + 1;
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Factor, FundamentalRecord};

    fn snap(symbol: &str, roe: f64, pe: f64) -> InstrumentSnapshot {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let rec = FundamentalRecord::new(symbol, date)
            .with(Factor::Roe, roe)
            .with(Factor::Pe, pe);
        InstrumentSnapshot::new(symbol, date, Some(100.0), Some(&rec))
    }

    fn symbols(r: &[RankedCandidate]) -> Vec<&str> {
        r.iter().map(|c| c.snapshot.symbol.as_str()).collect()
    }

    fn universe() -> Vec<InstrumentSnapshot> {
        vec![
            snap("A", 10.0, 30.0),
            snap("B", 25.0, 40.0),
            snap("C", 18.0, 8.0),
            snap("D", 25.0, 12.0),
        ]
    }

    #[test]
    fn single_descending_with_symbol_tiebreak() {
        let engine = RankingEngine::new(
            vec![RankCriterion::new(Factor::Roe, Direction::Descending)],
            10,
        );
        assert_eq!(symbols(&engine.rank(&universe())), vec!["B", "D", "C", "A"]);
    }

    #[test]
    fn single_ascending() {
        let engine = RankingEngine::new(
            vec![RankCriterion::new(Factor::Pe, Direction::Ascending)],
            2,
        );
        assert_eq!(symbols(&engine.rank(&universe())), vec!["C", "D"]);
    }

    #[test]
    fn composite_sums_percentiles() {
        // roe desc percentiles: A .25, C .5, B/D .875
        // pe asc percentiles:   B .25, A .5, D .75, C 1.0
        // totals: A .75, B 1.125, C 1.5, D 1.625
        let engine = RankingEngine::new(
            vec![
                RankCriterion::new(Factor::Roe, Direction::Descending),
                RankCriterion::new(Factor::Pe, Direction::Ascending),
            ],
            4,
        );
        let ranked = engine.rank(&universe());
        assert_eq!(symbols(&ranked), vec!["D", "C", "B", "A"]);
        assert!((ranked[0].score - 1.625).abs() < 1e-12);
    }

    #[test]
    fn percentiles_are_in_unit_interval() {
        let c = RankCriterion::new(Factor::Roe, Direction::Descending);
        let s = percentile_scores(&universe(), &c);
        assert!(s.iter().all(|v| *v > 0.0 && *v <= 1.0));
    }

    #[test]
    fn no_criteria_orders_by_symbol() {
        let engine = RankingEngine::new(vec![], 3);
        let mut u = universe();
        u.reverse();
        assert_eq!(symbols(&engine.rank(&u)), vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_eligible_set() {
        let engine = RankingEngine::new(vec![], 3);
        assert!(engine.rank(&[]).is_empty());
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        assert_eq!(
            engine.rank_non_empty(&[], date),
            Err(BacktestError::EmptyUniverse { date })
        );
    }
}
