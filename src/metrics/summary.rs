use crate::metrics::timeseries::{calculate_equity_curve, max_drawdown};
use crate::portfolio::SimulatedTrade;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::cmp::Ordering;
use std::fmt;

//coarse quality bucket for a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Excellent,
    Good,
    Acceptable,
    NeedsWork,
}

impl Verdict {
    //win rate as a fraction, total profit in percent
    pub fn classify(win_rate: f64, total_profit: f64) -> Self {
        let win_pct = win_rate * 100.0;
        if win_pct >= 60.0 && total_profit > 20.0 {
            Verdict::Excellent
        } else if win_pct >= 50.0 && total_profit > 10.0 {
            Verdict::Good
        } else if win_pct >= 45.0 && total_profit > 0.0 {
            Verdict::Acceptable
        } else {
            Verdict::NeedsWork
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Excellent => "excellent",
            Verdict::Good => "good",
            Verdict::Acceptable => "acceptable",
            Verdict::NeedsWork => "needs work",
        };
        f.write_str(label)
    }
}

//aggregate statistics over one variant's closed trades
//profit figures are percentages; win_rate is a fraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRunResult {
    pub variant: String,
    pub num_trades: usize,
    pub num_wins: usize,
    pub num_losses: usize,
    pub num_breakeven: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
    pub profit_factor: f64,
    pub total_profit: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub median_profit: f64,
    pub max_drawdown: f64,
    pub worst_losing_streak: usize,
    pub verdict: Verdict,
}

//mean of a non-empty sample, zero otherwise
fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.mean()
    }
}

//aggregates closed trades in chronological order
pub fn aggregate(variant: &str, trades: &[SimulatedTrade]) -> VariantRunResult {
    let profits: Vec<f64> = trades.iter().map(|t| t.profit_pct).collect();
    VariantRunResult::from_profits(variant, &profits)
}

impl VariantRunResult {
    //computes every statistic from the ordered profit percentages
    pub fn from_profits(variant: &str, profits: &[f64]) -> Self {
        let num_trades = profits.len();

        //win/loss partition; breakeven trades sit with the losses for averaging and streaks
        let wins: Vec<f64> = profits.iter().copied().filter(|&p| p > 0.0).collect();
        let non_positive: Vec<f64> = profits
            .iter()
            .copied()
            .filter(|&p| p <= 0.0)
            .map(f64::abs)
            .collect();
        let num_losses = profits.iter().filter(|&&p| p < 0.0).count();
        let num_breakeven = non_positive.len() - num_losses;

        let win_rate = if num_trades > 0 {
            wins.len() as f64 / num_trades as f64
        } else {
            0.0
        };
        let avg_win = mean_or_zero(&wins);
        let avg_loss = mean_or_zero(&non_positive);
        let expectancy = win_rate * avg_win - (1.0 - win_rate) * avg_loss;

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = profits.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        //worst run of non-positive trades
        let (_, worst_losing_streak) = profits.iter().fold((0usize, 0usize), |(run, worst), &p| {
            let run = if p > 0.0 { 0 } else { run + 1 };
            (run, worst.max(run))
        });

        let curve = calculate_equity_curve(profits);
        let total_profit = curve.last().map(|p| p.cumulative).unwrap_or(0.0);

        let best_trade = profits.iter().copied().fold(None, |best: Option<f64>, p| {
            Some(best.map_or(p, |b| b.max(p)))
        });
        let worst_trade = profits.iter().copied().fold(None, |worst: Option<f64>, p| {
            Some(worst.map_or(p, |w| w.min(p)))
        });
        let median_profit = if profits.is_empty() {
            0.0
        } else {
            Data::new(profits.to_vec()).median()
        };

        VariantRunResult {
            variant: variant.to_string(),
            num_trades,
            num_wins: wins.len(),
            num_losses,
            num_breakeven,
            win_rate,
            avg_win,
            avg_loss,
            expectancy,
            profit_factor,
            total_profit,
            best_trade: best_trade.unwrap_or(0.0),
            worst_trade: worst_trade.unwrap_or(0.0),
            median_profit,
            max_drawdown: max_drawdown(&curve),
            worst_losing_streak,
            verdict: Verdict::classify(win_rate, total_profit),
        }
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows = [
            ("Variant", self.variant.clone()),
            ("Number of Trades", format!("{}", self.num_trades)),
            (
                "Wins / Losses / Breakeven",
                format!(
                    "{} / {} / {}",
                    self.num_wins, self.num_losses, self.num_breakeven
                ),
            ),
            ("Win Rate", format!("{:.2}%", self.win_rate * 100.0)),
            ("Avg Win", format!("{:.3}%", self.avg_win)),
            ("Avg Loss", format!("{:.3}%", self.avg_loss)),
            ("Expectancy", format!("{:.3}%", self.expectancy)),
            ("Profit Factor", format!("{:.3}", self.profit_factor)),
            ("Total Profit", format!("{:.2}%", self.total_profit)),
            ("Best Trade", format!("{:.2}%", self.best_trade)),
            ("Worst Trade", format!("{:.2}%", self.worst_trade)),
            ("Median Trade", format!("{:.3}%", self.median_profit)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown)),
            ("Worst Losing Streak", format!("{}", self.worst_losing_streak)),
            ("Verdict", self.verdict.to_string()),
        ];

        for (label, value) in rows {
            table.add_row(Row::new(vec![Cell::new(label), Cell::new(&value)]));
        }

        table.printstd();
    }
}

//total order used for ranking: traded variants first, then expectancy,
//profit factor and win rate (all descending), then name
pub fn compare_results(a: &VariantRunResult, b: &VariantRunResult) -> Ordering {
    (a.num_trades == 0)
        .cmp(&(b.num_trades == 0))
        .then_with(|| b.expectancy.total_cmp(&a.expectancy))
        .then_with(|| b.profit_factor.total_cmp(&a.profit_factor))
        .then_with(|| b.win_rate.total_cmp(&a.win_rate))
        .then_with(|| a.variant.cmp(&b.variant))
}

//ranks results best first
pub fn rank(results: &mut [VariantRunResult]) {
    results.sort_by(compare_results);
}
