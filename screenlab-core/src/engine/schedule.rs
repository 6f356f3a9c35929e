//! Rebalance calendar.

use chrono::{Datelike, NaiveDate};

use crate::config::RebalanceFrequency;
use crate::error::BacktestError;

/// Produces rebalance dates from a cadence. Pure and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceScheduler {
    pub frequency: RebalanceFrequency,
}

impl RebalanceScheduler {
    pub fn new(frequency: RebalanceFrequency) -> Self {
        Self { frequency }
    }

    /// Rebalance dates in `[start, end]`, strictly increasing.
    ///
    /// The first date is `start` itself; every later date is the first
    /// calendar day of a period (month, quarter beginning Jan/Apr/Jul/Oct, or
    /// year).
    pub fn schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, BacktestError> {
        if end <= start {
            return Err(BacktestError::invalid_dates(start, end));
        }
        let mut dates = vec![start];
        let mut cursor = start;
        while let Some(next) = self.next_period_start(cursor) {
            if next > end {
                break;
            }
            dates.push(next);
            cursor = next;
        }
        Ok(dates)
    }

    /// Map each rebalance date to the first trading day on or after it.
    ///
    /// Returns indices into `calendar` (sorted ascending). Dates whose first
    /// trading day falls after `end` are dropped, and two dates landing on
    /// the same trading day collapse into one.
    pub fn trading_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        calendar: &[NaiveDate],
    ) -> Result<Vec<usize>, BacktestError> {
        let mut out: Vec<usize> = Vec::new();
        for date in self.schedule(start, end)? {
            let idx = calendar.partition_point(|d| *d < date);
            match calendar.get(idx) {
                Some(d) if *d <= end => {
                    if out.last() != Some(&idx) {
                        out.push(idx);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// First day of the period following the one containing `d`.
    fn next_period_start(&self, d: NaiveDate) -> Option<NaiveDate> {
        let step = self.frequency.months() as i32;
        let month0 = d.month0() as i32;
        let period_start = month0 - month0 % step;
        let total = d.year() * 12 + period_start + step;
        NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
    }
}
