//! Market data: the provider interface, data windows and shipped providers.

pub mod align;
pub mod csv_import;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod window;

pub use align::{align_prices, AlignedPrices};
pub use csv_import::{load_fundamentals, load_prices, read_fundamentals, read_prices};
pub use memory::InMemoryProvider;
pub use provider::{DataError, MarketDataProvider};
pub use synthetic::{SyntheticUniverse, SYNTHETIC_INDEX};
pub use window::DataWindow;
