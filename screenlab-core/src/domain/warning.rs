//! Data-quality and recovery warnings attached to a simulation result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// No instrument passed the filter; the period was held in cash.
    EmptyUniverse,
    /// No selected instrument had a positive sizing value; equal weights used.
    DegenerateWeight,
    /// A held instrument was valued at its last known price on days without a print.
    CarryForward,
    /// A held instrument had no price at all; it contributed zero value.
    MissingPrice,
    /// The requested benchmark could not be replayed; the primary result stands.
    BenchmarkUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationWarning {
    pub kind: WarningKind,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub symbol: Option<String>,
    pub message: String,
}

impl SimulationWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            date: None,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}
