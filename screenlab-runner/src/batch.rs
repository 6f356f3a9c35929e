//! Batch execution of many configurations against one provider.
//!
//! Runs are independent and side-effect free, so the parallel path yields
//! exactly the results of the serial one, in input order.

use std::collections::HashMap;

use rayon::prelude::*;

use screenlab_core::data::MarketDataProvider;
use screenlab_core::Configuration;

use crate::result::BacktestResult;
use crate::runner::{run_with_benchmark, RunError};

/// Batch executor.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    parallel: bool,
    benchmark: Option<String>,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    /// Parallel, without a benchmark.
    pub fn new() -> Self {
        Self {
            parallel: true,
            benchmark: None,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Replay `symbol` alongside every run.
    pub fn with_benchmark(mut self, symbol: impl Into<String>) -> Self {
        self.benchmark = Some(symbol.into());
        self
    }

    /// Run every configuration; one outcome per input, in input order.
    pub fn run(
        &self,
        configs: &[Configuration],
        provider: &dyn MarketDataProvider,
    ) -> Vec<Result<BacktestResult, RunError>> {
        let benchmark = self.benchmark.as_deref();
        tracing::debug!(runs = configs.len(), parallel = self.parallel, "starting batch");
        if self.parallel {
            configs
                .par_iter()
                .map(|config| run_with_benchmark(config, provider, benchmark))
                .collect()
        } else {
            configs
                .iter()
                .map(|config| run_with_benchmark(config, provider, benchmark))
                .collect()
        }
    }

    /// Like [`run`](Self::run) but fails on the first error.
    pub fn run_all(
        &self,
        configs: &[Configuration],
        provider: &dyn MarketDataProvider,
    ) -> Result<BatchResults, RunError> {
        let results = self
            .run(configs, provider)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BatchResults::new(results))
    }
}

/// Results of a successful batch.
#[derive(Debug, Clone)]
pub struct BatchResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl BatchResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results by Sharpe ratio, best first.
    pub fn sorted_by_sharpe(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        sorted
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use screenlab_core::data::SyntheticUniverse;
    use screenlab_core::RebalanceFrequency;

    fn configs() -> Vec<Configuration> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 6, 30).unwrap();
        [RebalanceFrequency::Monthly, RebalanceFrequency::Quarterly]
            .into_iter()
            .flat_map(|freq| {
                [2usize, 5]
                    .into_iter()
                    .map(move |size| Configuration::new(100_000.0, start, end, freq, size))
            })
            .collect()
    }

    #[test]
    fn parallel_matches_serial() {
        let cfgs = configs();
        let provider = SyntheticUniverse::new(8, 3).build(cfgs[0].start_date, cfgs[0].end_date);
        let par = BatchRunner::new().run_all(&cfgs, &provider).unwrap();
        let ser = BatchRunner::new()
            .with_parallelism(false)
            .run_all(&cfgs, &provider)
            .unwrap();
        assert_eq!(par.all(), ser.all());
        assert_eq!(par.len(), 4);
    }

    #[test]
    fn lookup_by_run_id() {
        let cfgs = configs();
        let provider = SyntheticUniverse::new(6, 1).build(cfgs[0].start_date, cfgs[0].end_date);
        let results = BatchRunner::new().run_all(&cfgs, &provider).unwrap();
        let first = &results.all()[0];
        assert_eq!(results.get(&first.run_id), Some(first));
        assert!(results.get("missing").is_none());
        assert!(results.best().is_some());
    }

    #[test]
    fn one_failure_does_not_hide_the_others() {
        let mut cfgs = configs();
        cfgs[1].portfolio_size = 0;
        let provider = SyntheticUniverse::new(6, 1).build(cfgs[0].start_date, cfgs[0].end_date);
        let outcomes = BatchRunner::new().run(&cfgs, &provider);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_ok());
        assert!(BatchRunner::new().run_all(&cfgs, &provider).is_err());
    }
}
