//a rule-driven trading signal evaluator: runs a catalog of pullback variants
//over indicator-annotated intervals and ranks their simulated outcomes

pub mod config;
pub mod data;
pub mod engine;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{RunConfiguration, Selection};
    pub use crate::data::{load_csv, DataError, Indicator, IndicatorFrame, Interval, Timeframe};
    pub use crate::engine::{
        check_exit, BacktestConfig, BacktestEngine, ExitLevels, RiskManager, RiskParams,
        StopSource, VariantRun,
    };
    pub use crate::metrics::report::{
        print_ranked_table, top_recap, write_summary_csv, write_summary_json, write_trade_files,
    };
    pub use crate::metrics::{
        aggregate, calculate_equity_curve, rank, EquityPoint, VariantRunResult, Verdict,
    };
    pub use crate::portfolio::{ExitReason, OpenPosition, SimulatedTrade};
    pub use crate::strategy::{
        evaluate, normalize_key, ConfigError, Resolution, Variant, VariantRegistry,
        DEFAULT_VARIANT,
    };
}
