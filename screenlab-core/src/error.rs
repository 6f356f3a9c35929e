//! Engine error types.
//!
//! `BacktestError` is the taxonomy callers match on. Configuration and data
//! failures are fatal; empty universes and degenerate weights are normally
//! recovered inside the simulation loop and surface as warnings instead.

use chrono::NaiveDate;
use thiserror::Error;

use crate::engine::simulation::SimulationState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    /// Malformed window: end not after start, or market-cap min above max.
    #[error("invalid {field} range: {detail}")]
    InvalidRange { field: &'static str, detail: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No usable market data at all for the requested window. `reason`
    /// carries the provider's own error text.
    #[error("no usable market data between {start} and {end}: {reason}")]
    DataUnavailable {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    #[error("no eligible instruments on {date}")]
    EmptyUniverse { date: NaiveDate },

    #[error("every candidate has a non-positive {factor} value; cannot size by it")]
    DegenerateWeight { factor: String },

    #[error("benchmark '{symbol}' unavailable: {reason}")]
    BenchmarkUnavailable { symbol: String, reason: String },

    #[error("simulation cannot run from state {0:?}")]
    InvalidState(SimulationState),
}

impl BacktestError {
    pub fn invalid_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self::InvalidRange {
            field: "date",
            detail: format!("end {end} must be after start {start}"),
        }
    }

    /// Whether the error aborts a whole run (as opposed to a per-period fallback).
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EmptyUniverse { .. }
                | Self::DegenerateWeight { .. }
                | Self::BenchmarkUnavailable { .. }
        )
    }
}

/// Errors parsing the text forms of factors, directions, frequencies,
/// sizing modes and ranking specs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown factor '{0}' (expected market_cap, roce, roe, pe, pat or price)")]
    UnknownFactor(String),

    #[error("unknown ranking direction '{0}' (expected asc or desc)")]
    UnknownDirection(String),

    #[error("unknown rebalance frequency '{0}' (expected monthly, quarterly or yearly)")]
    UnknownFrequency(String),

    #[error("unknown sizing mode '{0}' (expected equal, market_cap or factor:<name>)")]
    UnknownSizing(String),

    #[error("malformed ranking criterion '{0}' (expected <factor>:<asc|desc>)")]
    MalformedCriterion(String),
}
