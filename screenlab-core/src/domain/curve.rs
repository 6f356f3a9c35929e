//! Equity and drawdown curves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio value on one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Decline from the running peak on one trading day, as a non-positive fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    pub drawdown: f64,
}

/// Daily equity curve with strictly increasing dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            points: Vec::with_capacity(n),
        }
    }

    /// Append a point. Dates must be strictly increasing.
    pub fn push(&mut self, date: NaiveDate, value: f64) {
        debug_assert!(
            self.points.last().map_or(true, |p| p.date < date),
            "equity curve dates must be strictly increasing"
        );
        self.points.push(EquityPoint { date, value });
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    /// Calendar days between the first and last point.
    pub fn elapsed_days(&self) -> i64 {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => (b.date - a.date).num_days(),
            _ => 0,
        }
    }

    /// Running-peak drawdown series: `value / peak - 1`, one O(n) pass.
    pub fn drawdown_curve(&self) -> DrawdownCurve {
        let mut peak = f64::NEG_INFINITY;
        let points = self
            .points
            .iter()
            .map(|p| {
                if p.value > peak {
                    peak = p.value;
                }
                let drawdown = if peak > 0.0 {
                    (p.value / peak - 1.0).min(0.0)
                } else {
                    0.0
                };
                DrawdownPoint {
                    date: p.date,
                    drawdown,
                }
            })
            .collect();
        DrawdownCurve { points }
    }
}

/// Drawdown series derived from an [`EquityCurve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawdownCurve {
    points: Vec<DrawdownPoint>,
}

impl DrawdownCurve {
    pub fn points(&self) -> &[DrawdownPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most negative drawdown, or 0.0 for an empty curve.
    pub fn min(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.drawdown)
            .fold(0.0_f64, f64::min)
    }
}
