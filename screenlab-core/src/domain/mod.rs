//! Domain types for ScreenLab

pub mod curve;
pub mod holding;
pub mod snapshot;
pub mod warning;

pub use curve::{DrawdownCurve, DrawdownPoint, EquityCurve, EquityPoint};
pub use holding::{Holding, Rebalance, TargetWeight, WEIGHT_TOLERANCE};
pub use snapshot::{Factor, FundamentalRecord, InstrumentSnapshot, PricePoint};
pub use warning::{SimulationWarning, WarningKind};
