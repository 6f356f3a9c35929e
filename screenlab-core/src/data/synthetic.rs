//! Seeded synthetic universe for demos, benchmarks and tests.
//!
//! Each instrument is a geometric random walk on weekdays with annual
//! fundamentals reports. An equal-weighted index over the universe is stored
//! as an index series. The same seed always produces the same data.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::memory::InMemoryProvider;
use crate::domain::{Factor, FundamentalRecord, PricePoint};

pub const SYNTHETIC_INDEX: &str = "SYNTH_INDEX";

/// Probability that any one fundamentals field is left missing.
const MISSING_FIELD_PROB: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticUniverse {
    pub instruments: usize,
    pub seed: u64,
}

impl SyntheticUniverse {
    pub fn new(instruments: usize, seed: u64) -> Self {
        Self { instruments, seed }
    }

    pub fn symbol(i: usize) -> String {
        format!("SYN{i:03}")
    }

    /// Generate a provider covering `[start, end]`, with one extra year of
    /// fundamentals before `start` so the first rebalance has data.
    pub fn build(&self, start: NaiveDate, end: NaiveDate) -> InMemoryProvider {
        let calendar = weekdays(start, end);
        let mut provider = InMemoryProvider::new(format!("synthetic(seed={})", self.seed));
        let mut index_sum = vec![0.0; calendar.len()];

        for i in 0..self.instruments {
            let symbol = Self::symbol(i);
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));

            let series = random_walk(&mut rng, &calendar);
            for (acc, p) in index_sum.iter_mut().zip(&series) {
                *acc += p.close / series[0].close;
            }

            let shares: f64 = rng.gen_range(1.0e6..5.0e8);
            for year in (start.year() - 1)..=end.year() {
                let Some(as_of) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                    continue;
                };
                let reference = series
                    .iter()
                    .rev()
                    .find(|p| p.date <= as_of)
                    .or_else(|| series.first())
                    .map_or(100.0, |p| p.close);
                let record = fundamentals(&mut rng, &symbol, as_of, reference * shares);
                provider.push_fundamental(record);
            }
            provider.insert_price_series(symbol, series);
        }

        if self.instruments > 0 {
            let n = self.instruments as f64;
            let index = calendar
                .iter()
                .zip(&index_sum)
                .map(|(d, s)| PricePoint::new(*d, 1000.0 * s / n))
                .collect();
            provider.insert_index(SYNTHETIC_INDEX, index);
        }
        provider
    }
}

fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut d = start;
    while d <= end {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d += Duration::days(1);
    }
    out
}

fn random_walk(rng: &mut StdRng, calendar: &[NaiveDate]) -> Vec<PricePoint> {
    let drift: f64 = rng.gen_range(-0.0003..0.0009);
    let vol: f64 = rng.gen_range(0.008..0.03);
    let mut price: f64 = rng.gen_range(50.0..2_000.0);
    calendar
        .iter()
        .map(|d| {
            // Irwin-Hall approximation of a standard normal draw.
            let z: f64 = (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0;
            price *= (drift + vol * z).exp();
            PricePoint::new(*d, price)
        })
        .collect()
}

fn fundamentals(
    rng: &mut StdRng,
    symbol: &str,
    as_of: NaiveDate,
    market_cap: f64,
) -> FundamentalRecord {
    let draws = [
        (Factor::MarketCap, market_cap),
        (Factor::Roce, rng.gen_range(-5.0..40.0)),
        (Factor::Roe, rng.gen_range(-5.0..35.0)),
        (Factor::Pe, rng.gen_range(4.0..80.0)),
        (Factor::Pat, rng.gen_range(-50.0..5_000.0)),
    ];
    draws
        .into_iter()
        .fold(FundamentalRecord::new(symbol, as_of), |rec, (factor, value)| {
            if rng.gen_bool(MISSING_FIELD_PROB) {
                rec
            } else {
                rec.with(factor, value)
            }
        })
}
