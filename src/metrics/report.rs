use crate::engine::VariantRun;
use crate::metrics::summary::VariantRunResult;
use crate::portfolio::SimulatedTrade;
use anyhow::{Context, Result};
use prettytable::{Cell, Row, Table};
use std::fs;
use std::path::{Path, PathBuf};

//prints ranked results as a comparison table
pub fn print_ranked_table(results: &[VariantRunResult]) {
    let mut table = Table::new();

    table.add_row(Row::new(
        [
            "Rank", "Variant", "Trades", "Win Rate", "Avg Win", "Avg Loss", "Expectancy", "PF",
            "Max DD", "Streak", "Total", "Verdict",
        ]
        .iter()
        .map(|h| Cell::new(h))
        .collect(),
    ));

    for (rank, r) in results.iter().enumerate() {
        table.add_row(Row::new(vec![
            Cell::new(&format!("{}", rank + 1)),
            Cell::new(&r.variant),
            Cell::new(&format!("{}", r.num_trades)),
            Cell::new(&format!("{:.1}%", r.win_rate * 100.0)),
            Cell::new(&format!("{:.3}%", r.avg_win)),
            Cell::new(&format!("{:.3}%", r.avg_loss)),
            Cell::new(&format!("{:.3}%", r.expectancy)),
            Cell::new(&format!("{:.2}", r.profit_factor)),
            Cell::new(&format!("{:.2}%", r.max_drawdown)),
            Cell::new(&format!("{}", r.worst_losing_streak)),
            Cell::new(&format!("{:.2}%", r.total_profit)),
            Cell::new(&r.verdict.to_string()),
        ]));
    }

    table.printstd();
}

//short recap of the best ranked variants
pub fn top_recap(results: &[VariantRunResult], n: usize) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.num_trades > 0)
        .take(n)
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}: expectancy {:.3}%, win rate {:.1}%, {} trades ({})",
                i + 1,
                r.variant,
                r.expectancy,
                r.win_rate * 100.0,
                r.num_trades,
                r.verdict
            )
        })
        .collect()
}

pub fn write_summary_csv<P: AsRef<Path>>(results: &[VariantRunResult], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json<P: AsRef<Path>>(results: &[VariantRunResult], path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_trades_csv<P: AsRef<Path>>(trades: &[SimulatedTrade], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}

//one <variant>_trades.csv per run; returns the written paths
pub fn write_trade_files<P: AsRef<Path>>(runs: &[VariantRun], dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    runs.iter()
        .map(|run| {
            let path = dir.join(format!("{}_trades.csv", run.variant));
            write_trades_csv(&run.trades, &path)?;
            Ok(path)
        })
        .collect()
}
