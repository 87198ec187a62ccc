use crate::engine::risk::{ExitLevels, StopSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//why a simulated trade closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopHit,
    TargetHit,
    RuleExit,
    //still open after the last interval, closed at its close
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::StopHit => "stop_hit",
            ExitReason::TargetHit => "target_hit",
            ExitReason::RuleExit => "rule_exit",
            ExitReason::EndOfData => "end_of_data",
        };
        f.write_str(label)
    }
}

//a long position opened by an entry signal
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    //index of the entry interval in the frame
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub levels: ExitLevels,
}

impl OpenPosition {
    pub fn new(
        entry_index: usize,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        levels: ExitLevels,
    ) -> Self {
        OpenPosition {
            entry_index,
            entry_time,
            entry_price,
            levels,
        }
    }

    //percentage return if closed at the given price
    pub fn profit_pct(&self, exit_price: f64) -> f64 {
        (exit_price - self.entry_price) / self.entry_price * 100.0
    }

    //risk distance (entry - stop) in price units, one R
    pub fn risk_per_unit(&self) -> f64 {
        self.entry_price - self.levels.stop_price
    }

    //consumes the position into an immutable closed trade
    pub fn close(
        self,
        exit_index: usize,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> SimulatedTrade {
        let profit_pct = self.profit_pct(exit_price);
        let risk = self.risk_per_unit();
        let r_multiple = if risk > 0.0 {
            (exit_price - self.entry_price) / risk
        } else {
            0.0
        };

        SimulatedTrade {
            entry_index: self.entry_index,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            stop_price: self.levels.stop_price,
            target_price: self.levels.target_price,
            stop_source: self.levels.stop_source,
            exit_index,
            exit_time,
            exit_price,
            exit_reason,
            profit_pct,
            r_multiple,
        }
    }
}

//a closed hypothetical trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub stop_source: StopSource,
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub profit_pct: f64,
    pub r_multiple: f64,
}

impl SimulatedTrade {
    pub fn is_win(&self) -> bool {
        self.profit_pct > 0.0
    }

    //number of intervals held
    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn position() -> OpenPosition {
        let t = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        OpenPosition::new(
            3,
            t,
            100.0,
            ExitLevels {
                stop_price: 98.0,
                target_price: 104.0,
                stop_source: StopSource::Reference,
            },
        )
    }

    #[test]
    fn close_computes_percent_and_r() {
        let p = position();
        let exit_time = p.entry_time + chrono::Duration::minutes(25);
        let trade = p.close(8, exit_time, 104.0, ExitReason::TargetHit);

        assert_relative_eq!(trade.profit_pct, 4.0, epsilon = 1e-12);
        assert_relative_eq!(trade.r_multiple, 2.0, epsilon = 1e-12);
        assert_eq!(trade.bars_held(), 5);
        assert!(trade.is_win());
    }

    #[test]
    fn stop_exit_is_minus_one_r() {
        let p = position();
        let exit_time = p.entry_time;
        let trade = p.close(4, exit_time, 98.0, ExitReason::StopHit);
        assert_relative_eq!(trade.profit_pct, -2.0, epsilon = 1e-12);
        assert_relative_eq!(trade.r_multiple, -1.0, epsilon = 1e-12);
        assert!(!trade.is_win());
        assert_eq!(trade.exit_reason.to_string(), "stop_hit");
    }
}
