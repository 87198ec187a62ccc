pub mod report;
pub mod summary;
pub mod timeseries;

pub use summary::{aggregate, compare_results, rank, VariantRunResult, Verdict};
pub use timeseries::{calculate_equity_curve, max_drawdown, EquityPoint};
