//! TOML backtest configuration file.
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000.0
//! start_date = "2023-01-01"
//! end_date = "2023-12-31"
//! frequency = "quarterly"
//!
//! [portfolio]
//! size = 10
//! sizing = "market_cap"        # equal | market_cap | factor:<name> | <name>
//!
//! [filters]
//! market_cap_min = 5000.0
//! roce_min = 15.0
//!
//! [ranking]
//! criteria = "roe:desc,pe:asc"
//! composite = true
//!
//! [benchmark]
//! symbol = "NIFTY50"
//! ```
//!
//! Text fields use the same forms the core types parse, so a file maps onto
//! one validated `Configuration`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use screenlab_core::{
    BacktestError, Configuration, FilterThresholds, ParseError, RankingSpec, RebalanceFrequency,
    SizingMode,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Invalid(#[from] BacktestError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub portfolio: PortfolioSection,
    #[serde(default)]
    pub filters: FilterThresholds,
    #[serde(default)]
    pub ranking: RankingSection,
    #[serde(default)]
    pub benchmark: Option<BenchmarkSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_frequency")]
    pub frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSection {
    pub size: usize,
    #[serde(default = "default_sizing")]
    pub sizing: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSection {
    /// Comma-separated `<factor>:<asc|desc>` list; empty ranks by symbol.
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub composite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSection {
    pub symbol: String,
}

fn default_frequency() -> String {
    "monthly".into()
}

fn default_sizing() -> String {
    "equal".into()
}

impl BacktestConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Convert to the engine's value object and validate it wholesale.
    pub fn to_configuration(&self) -> Result<Configuration, ConfigError> {
        let frequency: RebalanceFrequency = self.backtest.frequency.parse()?;
        let sizing: SizingMode = self.portfolio.sizing.parse()?;
        let ranking: RankingSpec = self.ranking.criteria.parse()?;
        let config = Configuration {
            sizing,
            filters: self.filters,
            ranking,
            composite_ranking: self.ranking.composite,
            ..Configuration::new(
                self.backtest.initial_capital,
                self.backtest.start_date,
                self.backtest.end_date,
                frequency,
                self.portfolio.size,
            )
        };
        config.validate()?;
        Ok(config)
    }

    pub fn benchmark_symbol(&self) -> Option<&str> {
        self.benchmark.as_ref().map(|b| b.symbol.as_str())
    }
}
