use crate::data::{DataError, IndicatorFrame};
use crate::engine::execution::check_exit;
use crate::engine::risk::{RiskManager, RiskParams};
use crate::metrics::{aggregate, calculate_equity_curve, EquityPoint, VariantRunResult};
use crate::portfolio::{ExitReason, OpenPosition, SimulatedTrade};
use crate::strategy::{evaluate_resolved, resolve_references, Variant};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

//result of simulating one variant over a frame
#[derive(Debug, Clone)]
pub struct VariantRun {
    pub variant: String,
    pub signal_count: usize,
    pub trades: Vec<SimulatedTrade>,
    pub summary: VariantRunResult,
    pub equity_curve: Vec<EquityPoint>,
}

//configuration for a backtest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    //positions allowed open at once; signals beyond this are skipped
    pub max_open_trades: usize,
    pub risk: RiskParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            max_open_trades: 1,
            risk: RiskParams::default(),
        }
    }
}

//replays entry signals against subsequent intervals
//holds no per-run state, so one engine can drive many variants concurrently
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: BacktestConfig,
    risk: RiskManager,
}

impl BacktestEngine {
    //creates a new backtest engine
    pub fn new(config: BacktestConfig) -> Self {
        BacktestEngine {
            config,
            risk: RiskManager::new(config.risk),
        }
    }

    //runs the backtest for a single variant
    pub fn run_variant(
        &self,
        frame: &IndicatorFrame,
        variant: &Variant,
    ) -> Result<VariantRun, DataError> {
        //fails fast on the first missing or non-finite reference
        let intervals = frame.intervals();
        let references = resolve_references(intervals, variant)?;
        let signals = evaluate_resolved(intervals, &references, variant);

        let max_open = self.config.max_open_trades.max(1);
        let mut open: Vec<OpenPosition> = Vec::new();
        let mut trades: Vec<SimulatedTrade> = Vec::new();

        //main backtest loop
        for (i, interval) in intervals.iter().enumerate() {
            let refs = &references[i];

            //exits first, only for positions entered on an earlier interval
            let mut still_open = Vec::with_capacity(open.len());
            for position in open.drain(..) {
                let fill = if position.entry_index < i {
                    check_exit(&position, interval, refs.fast, refs.slow, variant.exit)
                } else {
                    None
                };

                match fill {
                    Some(fill) => {
                        let trade =
                            position.close(i, interval.timestamp, fill.price, fill.reason);
                        debug!(
                            variant = %variant.name,
                            entry = trade.entry_index,
                            exit = trade.exit_index,
                            reason = %trade.exit_reason,
                            profit_pct = trade.profit_pct,
                            "trade closed"
                        );
                        trades.push(trade);
                    }
                    None => still_open.push(position),
                }
            }
            open = still_open;

            //entry at the signal interval's close
            if signals[i] && open.len() < max_open {
                let entry_price = interval.close;
                let levels = self
                    .risk
                    .compute_exit_levels(entry_price, &intervals[..=i], variant);
                debug!(
                    variant = %variant.name,
                    index = i,
                    entry_price,
                    stop = levels.stop_price,
                    target = levels.target_price,
                    "trade opened"
                );
                open.push(OpenPosition::new(i, interval.timestamp, entry_price, levels));
            }
        }

        //close whatever is left at the final close
        if let Some(last) = intervals.last() {
            let last_index = intervals.len() - 1;
            for position in open {
                trades.push(position.close(
                    last_index,
                    last.timestamp,
                    last.close,
                    ExitReason::EndOfData,
                ));
            }
        }

        let signal_count = signals.iter().filter(|&&s| s).count();
        let summary = aggregate(&variant.name, &trades);
        let profits: Vec<f64> = trades.iter().map(|t| t.profit_pct).collect();
        let equity_curve = calculate_equity_curve(&profits);

        info!(
            variant = %variant.name,
            signals = signal_count,
            trades = trades.len(),
            expectancy = summary.expectancy,
            "variant run complete"
        );

        Ok(VariantRun {
            variant: variant.name.clone(),
            signal_count,
            trades,
            summary,
            equity_curve,
        })
    }

    //runs every variant in parallel; results keep the input order
    //the first data error aborts the batch
    pub fn run_all(
        &self,
        frame: &IndicatorFrame,
        variants: &[Variant],
    ) -> Result<Vec<VariantRun>, DataError> {
        variants
            .par_iter()
            .map(|variant| self.run_variant(frame, variant))
            .collect()
    }
}
