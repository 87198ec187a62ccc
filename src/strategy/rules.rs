//rule families, one enum per independent axis
//each rule is a pure predicate over the current interval's resolved references

use crate::data::{Interval, Timeframe};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

//low within 0.1% above the fast reference
pub const SHALLOW_PULLBACK_PAD: f64 = 0.001;
//close within 0.25% above the fast reference
pub const MODERATE_PULLBACK_PAD: f64 = 0.0025;
//finite-difference lookback for slopes
pub const SLOPE_LOOKBACK: usize = 3;

//fast/slow moving averages resolved for one interval
//higher timeframe pairs are only present when the variant reads them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct References {
    pub fast: f64,
    pub slow: f64,
    pub htf_15m: Option<(f64, f64)>,
    pub htf_1h: Option<(f64, f64)>,
}

impl References {
    pub fn htf(&self, timeframe: Timeframe) -> Option<(f64, f64)> {
        match timeframe {
            Timeframe::M15 => self.htf_15m,
            Timeframe::H1 => self.htf_1h,
        }
    }

    //higher timeframe fast over slow; false when the pair was never resolved
    pub fn htf_bullish(&self, timeframe: Timeframe) -> bool {
        self.htf(timeframe)
            .map(|(fast, slow)| fast > slow)
            .unwrap_or(false)
    }
}

//mandatory structure: close > fast > slow
pub fn trend_aligned(interval: &Interval, refs: &References) -> bool {
    interval.close > refs.fast && refs.fast > refs.slow && interval.close > refs.slow
}

//bullish close above the fast reference, the unit of every confirmation run
pub fn bullish_above_fast(interval: &Interval, refs: &References) -> bool {
    interval.is_bullish() && interval.close > refs.fast
}

//bearish close below the fast reference, the unit of the disqualifying run
pub fn bearish_below_fast(interval: &Interval, refs: &References) -> bool {
    interval.is_bearish() && interval.close < refs.fast
}

//normalized fast/slow spread used by the compression constraint
pub fn normalized_spread(interval: &Interval, refs: &References) -> f64 {
    (refs.fast - refs.slow).abs() / interval.close
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullbackRule {
    //low dipped to the fast reference
    Shallow,
    //close still hugging the fast reference
    Moderate,
    //low tagged the slow reference but close recovered above it
    TouchSlow,
}

impl PullbackRule {
    pub fn holds(&self, interval: &Interval, refs: &References) -> bool {
        match self {
            PullbackRule::Shallow => interval.low <= refs.fast * (1.0 + SHALLOW_PULLBACK_PAD),
            PullbackRule::Moderate => interval.close <= refs.fast * (1.0 + MODERATE_PULLBACK_PAD),
            PullbackRule::TouchSlow => interval.low <= refs.slow && interval.close > refs.slow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConfirmationRule {
    BullishClose,
    ConsecutiveBullish { count: usize },
    AboveBoth,
}

impl ConfirmationRule {
    //bullish_run is the number of consecutive bullish-above-fast intervals ending here
    pub fn holds(&self, interval: &Interval, refs: &References, bullish_run: usize) -> bool {
        match self {
            ConfirmationRule::BullishClose => bullish_above_fast(interval, refs),
            ConfirmationRule::ConsecutiveBullish { count } => bullish_run >= *count,
            ConfirmationRule::AboveBoth => interval.close > refs.fast && interval.close > refs.slow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "timeframe")]
pub enum TrendFilter {
    None,
    HigherTimeframe(Timeframe),
}

impl TrendFilter {
    pub fn holds(&self, refs: &References) -> bool {
        match self {
            TrendFilter::None => true,
            TrendFilter::HigherTimeframe(tf) => refs.htf_bullish(*tf),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeRule {
    None,
    Fast,
    FastAndSlow,
}

impl SlopeRule {
    //lagged holds the references SLOPE_LOOKBACK intervals back, none near the start
    pub fn holds(&self, refs: &References, lagged: Option<&References>) -> bool {
        match (self, lagged) {
            (SlopeRule::None, _) => true,
            (_, None) => false,
            (SlopeRule::Fast, Some(past)) => refs.fast - past.fast > 0.0,
            (SlopeRule::FastAndSlow, Some(past)) => {
                refs.fast - past.fast > 0.0 && refs.slow - past.slow > 0.0
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SessionGate {
    Always,
    //inclusive on both ends, utc
    Window { start: NaiveTime, end: NaiveTime },
    //adaptive session: only while the 15m trend is up
    HigherTimeframeTrend,
}

impl SessionGate {
    //the default london/new york overlap window
    pub fn day_session() -> Self {
        SessionGate::Window {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }

    pub fn holds(&self, interval: &Interval, refs: &References) -> bool {
        match self {
            SessionGate::Always => true,
            SessionGate::Window { start, end } => {
                //second precision, sub-second noise in timestamps is ignored
                let t = interval.timestamp.time().with_nanosecond(0).unwrap_or_default();
                *start <= t && t <= *end
            }
            SessionGate::HigherTimeframeTrend => refs.htf_bullish(Timeframe::M15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StopRule {
    //a pad below the slow reference at entry
    BelowSlow,
    //a pad below the lowest low of the trailing intervals
    SwingLow { lookback: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    //stop and target only
    TargetOrStop,
    CloseBelowSlow,
    FastBelowSlow,
}

impl ExitRule {
    pub fn fires(&self, interval: &Interval, fast: f64, slow: f64) -> bool {
        match self {
            ExitRule::TargetOrStop => false,
            ExitRule::CloseBelowSlow => interval.close < slow,
            ExitRule::FastBelowSlow => fast < slow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(hour: u32, open: f64, high: f64, low: f64, close: f64) -> Interval {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, hour, 0, 0).unwrap();
        Interval::new(ts, open, high, low, close, 10.0)
    }

    fn refs(fast: f64, slow: f64) -> References {
        References {
            fast,
            slow,
            htf_15m: None,
            htf_1h: None,
        }
    }

    #[test]
    fn trend_alignment_requires_strict_order() {
        let c = candle(9, 100.0, 101.5, 99.5, 101.0);
        assert!(trend_aligned(&c, &refs(100.5, 100.0)));
        assert!(!trend_aligned(&c, &refs(100.0, 100.5)));
        assert!(!trend_aligned(&c, &refs(101.0, 100.0)));
    }

    #[test]
    fn pullback_depths() {
        let r = refs(100.0, 99.0);
        let dip = candle(9, 100.2, 100.8, 100.05, 100.5);
        assert!(PullbackRule::Shallow.holds(&dip, &r));
        assert!(!PullbackRule::Moderate.holds(&dip, &r));

        let hug = candle(9, 100.18, 100.4, 100.15, 100.2);
        assert!(!PullbackRule::Shallow.holds(&hug, &r));
        assert!(PullbackRule::Moderate.holds(&hug, &r));

        let tag = candle(9, 99.5, 100.6, 98.9, 100.4);
        assert!(PullbackRule::TouchSlow.holds(&tag, &r));
        let no_recovery = candle(9, 99.5, 99.6, 98.5, 98.9);
        assert!(!PullbackRule::TouchSlow.holds(&no_recovery, &r));
    }

    #[test]
    fn confirmation_variants() {
        let r = refs(100.0, 99.0);
        let green = candle(9, 100.1, 100.8, 100.0, 100.6);
        assert!(ConfirmationRule::BullishClose.holds(&green, &r, 1));
        assert!(!ConfirmationRule::ConsecutiveBullish { count: 2 }.holds(&green, &r, 1));
        assert!(ConfirmationRule::ConsecutiveBullish { count: 2 }.holds(&green, &r, 2));

        let red_above = candle(9, 100.8, 100.9, 100.2, 100.4);
        assert!(!ConfirmationRule::BullishClose.holds(&red_above, &r, 0));
        assert!(ConfirmationRule::AboveBoth.holds(&red_above, &r, 0));
    }

    #[test]
    fn slope_needs_history() {
        let now = refs(101.0, 100.2);
        let past = refs(100.5, 100.3);
        assert!(SlopeRule::None.holds(&now, None));
        assert!(!SlopeRule::Fast.holds(&now, None));
        assert!(SlopeRule::Fast.holds(&now, Some(&past)));
        assert!(!SlopeRule::FastAndSlow.holds(&now, Some(&past)));
    }

    #[test]
    fn session_window_is_inclusive() {
        let gate = SessionGate::day_session();
        let r = refs(1.0, 0.5);
        assert!(gate.holds(&candle(8, 1.0, 1.0, 1.0, 1.0), &r));
        assert!(gate.holds(&candle(16, 1.0, 1.0, 1.0, 1.0), &r));
        assert!(!gate.holds(&candle(17, 1.0, 1.0, 1.0, 1.0), &r));
        assert!(!gate.holds(&candle(7, 1.0, 1.0, 1.0, 1.0), &r));
    }

    #[test]
    fn higher_timeframe_filters() {
        let mut r = refs(1.0, 0.5);
        assert!(TrendFilter::None.holds(&r));
        assert!(!TrendFilter::HigherTimeframe(Timeframe::M15).holds(&r));

        r.htf_15m = Some((2.0, 1.0));
        r.htf_1h = Some((1.0, 2.0));
        assert!(TrendFilter::HigherTimeframe(Timeframe::M15).holds(&r));
        assert!(!TrendFilter::HigherTimeframe(Timeframe::H1).holds(&r));
        assert!(SessionGate::HigherTimeframeTrend.holds(&candle(3, 1.0, 1.0, 1.0, 1.0), &r));
    }

    #[test]
    fn exit_rules() {
        let c = candle(9, 100.0, 100.5, 99.0, 99.2);
        assert!(!ExitRule::TargetOrStop.fires(&c, 99.0, 100.0));
        assert!(ExitRule::CloseBelowSlow.fires(&c, 100.0, 99.5));
        assert!(!ExitRule::CloseBelowSlow.fires(&c, 100.0, 99.0));
        assert!(ExitRule::FastBelowSlow.fires(&c, 99.0, 99.5));
    }
}
