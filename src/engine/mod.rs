pub mod backtest;
pub mod execution;
pub mod risk;

pub use backtest::{BacktestConfig, BacktestEngine, VariantRun};
pub use execution::{check_exit, ExitFill};
pub use risk::{ExitLevels, RiskManager, RiskParams, StopSource};
