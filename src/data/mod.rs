pub mod frame;
pub mod interval;
pub mod loader;

pub use frame::IndicatorFrame;
pub use interval::{DataError, Indicator, Interval, Timeframe};
pub use loader::load_csv;
