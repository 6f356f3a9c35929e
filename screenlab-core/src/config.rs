//! The backtest configuration value object.
//!
//! A `Configuration` is built once, validated wholesale, and never mutated by
//! the engine. The text forms accepted here (`"roe:desc,pe:asc"`, `"roce"`,
//! `"quarterly"`) are the ones the web form submits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::Factor;
use crate::error::{BacktestError, ParseError};

/// How often holdings are re-selected and re-weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl RebalanceFrequency {
    /// Length of one period in months.
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }
}

impl fmt::Display for RebalanceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        })
    }
}

impl FromStr for RebalanceFrequency {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Self::Quarterly),
            "yearly" | "annual" | "annually" | "year" | "y" => Ok(Self::Yearly),
            other => Err(ParseError::UnknownFrequency(other.to_string())),
        }
    }
}

/// How target weights are derived from the selected instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    Equal,
    MarketCap,
    /// Proportional to the positive part of a factor (e.g. ROCE-weighted).
    Factor(Factor),
}

impl SizingMode {
    /// The snapshot field this mode reads, if any.
    pub fn factor(&self) -> Option<Factor> {
        match self {
            Self::Equal => None,
            Self::MarketCap => Some(Factor::MarketCap),
            Self::Factor(f) => Some(*f),
        }
    }
}

impl fmt::Display for SizingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => f.write_str("equal"),
            Self::MarketCap => f.write_str("market_cap"),
            Self::Factor(factor) => write!(f, "factor:{factor}"),
        }
    }
}

impl FromStr for SizingMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "equal" {
            return Ok(Self::Equal);
        }
        if let Some(rest) = s.strip_prefix("factor:") {
            return rest
                .parse::<Factor>()
                .map(Self::Factor)
                .map_err(|_| ParseError::UnknownSizing(s.clone()));
        }
        match s.parse::<Factor>() {
            Ok(Factor::MarketCap) => Ok(Self::MarketCap),
            Ok(factor) => Ok(Self::Factor(factor)),
            Err(_) => Err(ParseError::UnknownSizing(s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Lower values rank better (e.g. P/E).
    Ascending,
    /// Higher values rank better (e.g. ROE).
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        })
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(ParseError::UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankCriterion {
    pub factor: Factor,
    pub direction: Direction,
}

impl RankCriterion {
    pub fn new(factor: Factor, direction: Direction) -> Self {
        Self { factor, direction }
    }
}

impl fmt::Display for RankCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.factor, self.direction)
    }
}

impl FromStr for RankCriterion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (factor, direction) = s
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedCriterion(s.trim().to_string()))?;
        Ok(Self {
            factor: factor.parse()?,
            direction: direction.parse()?,
        })
    }
}

/// Ordered list of ranking criteria. One entry means single-factor ranking;
/// more entries are combined when composite ranking is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingSpec {
    pub criteria: Vec<RankCriterion>,
}

impl RankingSpec {
    pub fn new(criteria: Vec<RankCriterion>) -> Self {
        Self { criteria }
    }

    pub fn single(factor: Factor, direction: Direction) -> Self {
        Self::new(vec![RankCriterion::new(factor, direction)])
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn factors(&self) -> impl Iterator<Item = Factor> + '_ {
        self.criteria.iter().map(|c| c.factor)
    }
}

impl fmt::Display for RankingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.criteria.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for RankingSpec {
    type Err = ParseError;

    /// Parses `"roe:desc,pe:asc"`. Blank entries are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let criteria = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<RankCriterion>, _>>()?;
        Ok(Self { criteria })
    }
}

/// Screening thresholds. `None` means the predicate is not applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterThresholds {
    #[serde(default)]
    pub market_cap_min: Option<f64>,
    #[serde(default)]
    pub market_cap_max: Option<f64>,
    #[serde(default)]
    pub roce_min: Option<f64>,
    #[serde(default)]
    pub pat_min: Option<f64>,
}

impl FilterThresholds {
    pub fn none() -> Self {
        Self::default()
    }

    /// Snapshot fields that must be present for the thresholds to be evaluated.
    pub fn required_factors(&self) -> Vec<Factor> {
        let mut out = Vec::new();
        if self.market_cap_min.is_some() || self.market_cap_max.is_some() {
            out.push(Factor::MarketCap);
        }
        if self.roce_min.is_some() {
            out.push(Factor::Roce);
        }
        if self.pat_min.is_some() {
            out.push(Factor::Pat);
        }
        out
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        let fields = [
            ("market_cap_min", self.market_cap_min),
            ("market_cap_max", self.market_cap_max),
            ("roce_min", self.roce_min),
            ("pat_min", self.pat_min),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(BacktestError::InvalidConfig(format!(
                        "{name} must be finite, got {v}"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.market_cap_min, self.market_cap_max) {
            if min > max {
                return Err(BacktestError::InvalidRange {
                    field: "market_cap",
                    detail: format!("min {min} exceeds max {max}"),
                });
            }
        }
        Ok(())
    }
}

/// Complete description of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub frequency: RebalanceFrequency,
    pub sizing: SizingMode,
    pub portfolio_size: usize,
    #[serde(default)]
    pub filters: FilterThresholds,
    #[serde(default)]
    pub ranking: RankingSpec,
    #[serde(default)]
    pub composite_ranking: bool,
}

impl Configuration {
    /// Equal-weighted, unfiltered, unranked configuration. Adjust fields with
    /// struct-update syntax.
    pub fn new(
        initial_capital: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: RebalanceFrequency,
        portfolio_size: usize,
    ) -> Self {
        Self {
            initial_capital,
            start_date,
            end_date,
            frequency,
            sizing: SizingMode::Equal,
            portfolio_size,
            filters: FilterThresholds::none(),
            ranking: RankingSpec::default(),
            composite_ranking: false,
        }
    }

    /// Check every invariant. Runs before any simulation work.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.end_date <= self.start_date {
            return Err(BacktestError::invalid_dates(self.start_date, self.end_date));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::InvalidConfig(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.portfolio_size == 0 {
            return Err(BacktestError::InvalidConfig(
                "portfolio size must be at least 1".into(),
            ));
        }
        self.filters.validate()
    }

    /// Portfolio size must not exceed the investable universe.
    pub fn validate_universe(&self, universe_size: usize) -> Result<(), BacktestError> {
        if self.portfolio_size > universe_size {
            return Err(BacktestError::InvalidConfig(format!(
                "portfolio size {} exceeds universe size {universe_size}",
                self.portfolio_size
            )));
        }
        Ok(())
    }

    /// Criteria actually used for ranking: all of them for composite ranking,
    /// otherwise only the first.
    pub fn effective_criteria(&self) -> &[RankCriterion] {
        let all = &self.ranking.criteria;
        if self.composite_ranking || all.len() <= 1 {
            all
        } else {
            &all[..1]
        }
    }

    /// Every snapshot field an instrument must carry to be considered.
    pub fn required_factors(&self) -> Vec<Factor> {
        let mut factors = vec![Factor::Price];
        factors.extend(self.filters.required_factors());
        factors.extend(self.effective_criteria().iter().map(|c| c.factor));
        factors.extend(self.sizing.factor());
        factors.sort();
        factors.dedup();
        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn base() -> Configuration {
        Configuration::new(
            100_000.0,
            d("2023-01-01"),
            d("2023-12-31"),
            RebalanceFrequency::Monthly,
            5,
        )
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn end_before_start_is_invalid_range() {
        let cfg = Configuration {
            end_date: d("2022-12-31"),
            ..base()
        };
        assert!(matches!(
            cfg.validate(),
            Err(BacktestError::InvalidRange { field: "date", .. })
        ));
    }

    #[test]
    fn equal_dates_are_invalid_range() {
        let cfg = Configuration {
            end_date: d("2023-01-01"),
            ..base()
        };
        assert!(matches!(cfg.validate(), Err(BacktestError::InvalidRange { .. })));
    }

    #[test]
    fn market_cap_min_above_max_is_invalid_range() {
        let cfg = Configuration {
            filters: FilterThresholds {
                market_cap_min: Some(5_000.0),
                market_cap_max: Some(1_000.0),
                ..FilterThresholds::none()
            },
            ..base()
        };
        assert!(matches!(
            cfg.validate(),
            Err(BacktestError::InvalidRange { field: "market_cap", .. })
        ));
    }

    #[test]
    fn nonpositive_capital_rejected() {
        let cfg = Configuration {
            initial_capital: 0.0,
            ..base()
        };
        assert!(matches!(cfg.validate(), Err(BacktestError::InvalidConfig(_))));
    }

    #[test]
    fn zero_portfolio_size_rejected() {
        let cfg = Configuration {
            portfolio_size: 0,
            ..base()
        };
        assert!(matches!(cfg.validate(), Err(BacktestError::InvalidConfig(_))));
    }

    #[test]
    fn portfolio_larger_than_universe_rejected() {
        assert!(base().validate_universe(4).is_err());
        assert!(base().validate_universe(5).is_ok());
    }

    #[test]
    fn ranking_spec_parses_form_value() {
        let spec: RankingSpec = "roe:desc, pe:asc".parse().unwrap();
        assert_eq!(
            spec.criteria,
            vec![
                RankCriterion::new(Factor::Roe, Direction::Descending),
                RankCriterion::new(Factor::Pe, Direction::Ascending),
            ]
        );
        assert_eq!(spec.to_string(), "roe:desc,pe:asc");
    }

    #[test]
    fn ranking_spec_rejects_missing_direction() {
        assert_eq!(
            "roe".parse::<RankingSpec>(),
            Err(ParseError::MalformedCriterion("roe".into()))
        );
        assert!("roe:up".parse::<RankingSpec>().is_err());
    }

    #[test]
    fn sizing_mode_parses_form_values() {
        assert_eq!("equal".parse::<SizingMode>().unwrap(), SizingMode::Equal);
        assert_eq!("market_cap".parse::<SizingMode>().unwrap(), SizingMode::MarketCap);
        assert_eq!(
            "roce".parse::<SizingMode>().unwrap(),
            SizingMode::Factor(Factor::Roce)
        );
        assert_eq!(
            "factor:roe".parse::<SizingMode>().unwrap(),
            SizingMode::Factor(Factor::Roe)
        );
        assert!("kelly".parse::<SizingMode>().is_err());
    }

    #[test]
    fn frequency_parses() {
        assert_eq!("Quarterly".parse::<RebalanceFrequency>().unwrap().months(), 3);
        assert!("weekly".parse::<RebalanceFrequency>().is_err());
    }

    #[test]
    fn non_composite_uses_first_criterion_only() {
        let cfg = Configuration {
            ranking: "roe:desc,pe:asc".parse().unwrap(),
            ..base()
        };
        assert_eq!(cfg.effective_criteria().len(), 1);
        let composite = Configuration {
            composite_ranking: true,
            ..cfg
        };
        assert_eq!(composite.effective_criteria().len(), 2);
    }

    #[test]
    fn required_factors_collects_filters_ranking_and_sizing() {
        let cfg = Configuration {
            filters: FilterThresholds {
                roce_min: Some(15.0),
                ..FilterThresholds::none()
            },
            ranking: RankingSpec::single(Factor::Pe, Direction::Ascending),
            sizing: SizingMode::MarketCap,
            ..base()
        };
        assert_eq!(
            cfg.required_factors(),
            vec![Factor::MarketCap, Factor::Roce, Factor::Pe, Factor::Price]
        );
    }

    #[test]
    fn configuration_json_roundtrip() {
        let cfg = Configuration {
            sizing: SizingMode::Factor(Factor::Roce),
            ranking: "roe:desc".parse().unwrap(),
            ..base()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
