use crate::data::{DataError, Indicator, Interval, Timeframe};
use crate::strategy::rules::{self, References, SLOPE_LOOKBACK};
use crate::strategy::variant::{Extension, Variant};

//running counters threaded through one forward scan
//each field describes the run ending at the interval just folded in
#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    bullish_run: usize,
    above_fast_run: usize,
    compressed_run: usize,
    bearish_run: usize,
    //latest index at which a full disqualifying bearish run ended
    last_bearish_trip: Option<usize>,
}

impl ScanState {
    fn advance(
        mut self,
        index: usize,
        interval: &Interval,
        refs: &References,
        variant: &Variant,
    ) -> Self {
        self.bullish_run = bump(self.bullish_run, rules::bullish_above_fast(interval, refs));
        self.above_fast_run = bump(self.above_fast_run, interval.close > refs.fast);
        self.bearish_run = bump(self.bearish_run, rules::bearish_below_fast(interval, refs));

        if let Extension::Compression { threshold, .. } = variant.extension {
            self.compressed_run = bump(
                self.compressed_run,
                rules::normalized_spread(interval, refs) < threshold,
            );
        }

        if self.bearish_run >= variant.bearish_guard.run_length {
            self.last_bearish_trip = Some(index);
        }

        self
    }

    //true when a full run lies inside the trailing window ending at index
    fn bearish_disqualified(&self, index: usize, variant: &Variant) -> bool {
        let guard = variant.bearish_guard;
        let window_start = (index + 1).saturating_sub(guard.window);
        match self.last_bearish_trip {
            Some(end) => end + 1 >= window_start + guard.run_length,
            None => false,
        }
    }
}

fn bump(run: usize, holds: bool) -> usize {
    if holds {
        run + 1
    } else {
        0
    }
}

//resolves the fast/slow (and any higher timeframe) references for every interval
//fails on the first missing or non-finite value
pub fn resolve_references(
    intervals: &[Interval],
    variant: &Variant,
) -> Result<Vec<References>, DataError> {
    let required = variant.required_indicators();
    let needs = |indicator| required.contains(&indicator);
    let needs_15m = needs(Indicator::HtfFastMa(Timeframe::M15));
    let needs_1h = needs(Indicator::HtfFastMa(Timeframe::H1));

    intervals
        .iter()
        .enumerate()
        .map(|(index, interval)| -> Result<References, DataError> {
            let htf = |tf: Timeframe| -> Result<(f64, f64), DataError> {
                Ok((
                    interval.require(Indicator::HtfFastMa(tf), index)?,
                    interval.require(Indicator::HtfSlowMa(tf), index)?,
                ))
            };

            Ok(References {
                fast: interval.require(Indicator::FastMa, index)?,
                slow: interval.require(Indicator::SlowMa, index)?,
                htf_15m: if needs_15m { Some(htf(Timeframe::M15)?) } else { None },
                htf_1h: if needs_1h { Some(htf(Timeframe::H1)?) } else { None },
            })
        })
        .collect()
}

//per-interval entry flags for one variant
//flag i depends only on intervals[..=i]
pub fn evaluate(intervals: &[Interval], variant: &Variant) -> Result<Vec<bool>, DataError> {
    let references = resolve_references(intervals, variant)?;
    Ok(evaluate_resolved(intervals, &references, variant))
}

//same scan over references already produced by resolve_references
//intervals and references must be the same length
pub fn evaluate_resolved(
    intervals: &[Interval],
    references: &[References],
    variant: &Variant,
) -> Vec<bool> {
    let mut state = ScanState::default();
    let mut signals = Vec::with_capacity(intervals.len());

    for (index, (interval, refs)) in intervals.iter().zip(references).enumerate() {
        state = state.advance(index, interval, refs, variant);
        let lagged = index
            .checked_sub(SLOPE_LOOKBACK)
            .map(|past| &references[past]);
        signals.push(entry_fires(index, interval, refs, lagged, &state, variant));
    }

    signals
}

fn entry_fires(
    index: usize,
    interval: &Interval,
    refs: &References,
    lagged: Option<&References>,
    state: &ScanState,
    variant: &Variant,
) -> bool {
    //1. structure
    if !rules::trend_aligned(interval, refs) {
        return false;
    }

    //2. time of day
    if !variant.session.holds(interval, refs) {
        return false;
    }

    //3. higher timeframe trend
    if !variant.trend_filter.holds(refs) {
        return false;
    }

    //4. pullback depth, or a continuation run instead of it
    let setup = match variant.extension {
        Extension::Continuation {
            length,
            near_fast_pad,
        } => state.above_fast_run >= length && interval.low <= refs.fast * (1.0 + near_fast_pad),
        _ => variant.pullback.holds(interval, refs),
    };
    if !setup {
        return false;
    }

    //5. confirmation
    if !variant.confirmation.holds(interval, refs, state.bullish_run) {
        return false;
    }

    //6. slope
    if !variant.slope.holds(refs, lagged) {
        return false;
    }

    //7. compression
    if let Extension::Compression { length, .. } = variant.extension {
        if state.compressed_run < length {
            return false;
        }
    }

    //8. bearish guard, which needs its whole window
    let guard = variant.bearish_guard;
    if index + 1 < guard.window {
        return false;
    }
    !state.bearish_disqualified(index, variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::registry::VariantRegistry;
    use crate::strategy::rules::{ConfirmationRule, SessionGate, SlopeRule, TrendFilter};
    use crate::strategy::variant::BearishGuard;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn loose() -> Variant {
        let mut v = VariantRegistry::builtin().default_variant().clone();
        v.bearish_guard = BearishGuard {
            window: 1,
            run_length: 1,
        };
        v
    }

    //interval at minute offset with fast/slow references
    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64, fast: f64, slow: f64) -> Interval {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap() + Duration::minutes(5 * i);
        Interval::new(ts, open, high, low, close, 100.0)
            .with_indicator("ema_fast", fast)
            .with_indicator("ema_slow", slow)
    }

    //uptrend pullback candle that satisfies v1 on its own
    fn setup_bar(i: i64) -> Interval {
        bar(i, 100.1, 100.6, 100.05, 100.5, 100.0, 99.0)
    }

    //trend aligned but no pullback
    fn extended_bar(i: i64) -> Interval {
        bar(i, 101.0, 101.6, 100.9, 101.5, 100.0, 99.0)
    }

    fn bearish_bar(i: i64) -> Interval {
        bar(i, 99.9, 100.0, 99.2, 99.4, 100.0, 99.0)
    }

    #[test]
    fn single_setup_fires_once() {
        let intervals = vec![extended_bar(0), setup_bar(1), extended_bar(2)];
        let signals = evaluate(&intervals, &loose()).unwrap();
        assert_eq!(signals, vec![false, true, false]);
    }

    #[test]
    fn resolved_scan_matches_direct_evaluation() {
        let v = loose();
        let intervals: Vec<Interval> = (0..8)
            .map(|i| if i % 2 == 0 { setup_bar(i) } else { bearish_bar(i) })
            .collect();
        let references = resolve_references(&intervals, &v).unwrap();
        assert_eq!(
            evaluate_resolved(&intervals, &references, &v),
            evaluate(&intervals, &v).unwrap()
        );
    }

    #[test]
    fn missing_indicator_fails_fast() {
        let mut intervals = vec![setup_bar(0), setup_bar(1)];
        intervals[1].indicators.shift_remove("ema_fast");
        let err = evaluate(&intervals, &loose()).unwrap_err();
        assert!(matches!(err, DataError::MissingIndicator { index: 1, .. }));
    }

    #[test]
    fn htf_fields_only_required_when_read() {
        let intervals = vec![setup_bar(0)];
        let mut v = loose();
        assert!(evaluate(&intervals, &v).is_ok());

        v.trend_filter = TrendFilter::HigherTimeframe(Timeframe::H1);
        assert!(matches!(
            evaluate(&intervals, &v),
            Err(DataError::MissingIndicator {
                name: "ema_fast_1h",
                ..
            })
        ));
    }

    #[test]
    fn consecutive_confirmation_needs_history() {
        let mut v = loose();
        v.confirmation = ConfirmationRule::ConsecutiveBullish { count: 2 };

        let signals = evaluate(&[setup_bar(0), setup_bar(1)], &v).unwrap();
        assert_eq!(signals, vec![false, true]);

        //a red candle in between resets the run
        let signals = evaluate(&[setup_bar(0), bearish_bar(1), setup_bar(2)], &v).unwrap();
        assert_eq!(signals, vec![false, false, false]);
    }

    #[test]
    fn slope_rule_false_before_lookback() {
        let mut v = loose();
        v.slope = SlopeRule::Fast;
        let intervals: Vec<Interval> = (0..5)
            .map(|i| {
                let lift = i as f64 * 0.1;
                bar(i, 100.1 + lift, 100.6 + lift, 100.05 + lift, 100.5 + lift, 100.0 + lift, 99.0)
            })
            .collect();
        let signals = evaluate(&intervals, &v).unwrap();
        assert_eq!(signals, vec![false, false, false, true, true]);
    }

    #[test]
    fn bearish_run_disqualifies_within_window() {
        let mut v = loose();
        v.bearish_guard = BearishGuard {
            window: 6,
            run_length: 3,
        };

        let mut intervals = vec![
            extended_bar(0),
            bearish_bar(1),
            bearish_bar(2),
            bearish_bar(3),
            extended_bar(4),
        ];
        intervals.push(setup_bar(5));
        intervals.push(setup_bar(6));
        intervals.push(setup_bar(7));
        intervals.push(setup_bar(8));

        let signals = evaluate(&intervals, &v).unwrap();
        //window at 5 covers 0..=5, at 6 covers 1..=6, at 7 covers 2..=7 (run 1..=3 no longer whole)
        assert_eq!(
            signals,
            vec![false, false, false, false, false, false, false, true, true]
        );
    }

    #[test]
    fn short_history_never_fires_under_guard() {
        let v = VariantRegistry::builtin().default_variant().clone();
        let intervals: Vec<Interval> = (0..9).map(setup_bar).collect();
        assert!(evaluate(&intervals, &v).unwrap().iter().all(|s| !s));

        let intervals: Vec<Interval> = (0..10).map(setup_bar).collect();
        assert!(evaluate(&intervals, &v).unwrap()[9]);
    }

    #[test]
    fn compression_requires_full_tight_window() {
        let mut v = loose();
        v.extension = Extension::Compression {
            threshold: 0.002,
            length: 3,
        };
        let tight = |i| bar(i, 100.1, 100.6, 100.05, 100.5, 100.0, 99.9);

        let signals = evaluate(&[tight(0), tight(1), tight(2)], &v).unwrap();
        assert_eq!(signals, vec![false, false, true]);

        //spread of 1% at bar 1 breaks the window
        let signals = evaluate(&[tight(0), setup_bar(1), tight(2), tight(3)], &v).unwrap();
        assert_eq!(signals, vec![false, false, false, false]);
    }

    #[test]
    fn continuation_replaces_pullback() {
        let mut v = loose();
        v.extension = Extension::Continuation {
            length: 3,
            near_fast_pad: 0.0015,
        };

        //closes above fast every bar, lows stay near it
        let near = |i| bar(i, 100.2, 100.8, 100.1, 100.7, 100.0, 99.0);
        let signals = evaluate(&[near(0), near(1), near(2), near(3)], &v).unwrap();
        assert_eq!(signals, vec![false, false, true, true]);

        //a low far above fast is not a continuation entry
        let signals = evaluate(&[near(0), near(1), extended_bar(2)], &v).unwrap();
        assert_eq!(signals, vec![false, false, false]);
    }

    #[test]
    fn session_gate_blocks_outside_window() {
        let mut v = loose();
        v.session = SessionGate::day_session();
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 20, 0, 0).unwrap();
        let mut late = setup_bar(0);
        late.timestamp = ts;
        assert_eq!(evaluate(&[late], &v).unwrap(), vec![false]);
    }

    #[test]
    fn prefix_evaluation_is_stable() {
        let v = loose();
        let intervals: Vec<Interval> = (0..12)
            .map(|i| if i % 3 == 0 { setup_bar(i) } else { extended_bar(i) })
            .collect();
        let full = evaluate(&intervals, &v).unwrap();
        for end in 1..=intervals.len() {
            let prefix = evaluate(&intervals[..end], &v).unwrap();
            assert_eq!(prefix[..], full[..end]);
        }
    }

    proptest! {
        #[test]
        fn signals_never_look_ahead(kinds in prop::collection::vec(0u8..3, 1..40)) {
            let v = VariantRegistry::builtin().default_variant().clone();
            let intervals: Vec<Interval> = kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| match kind {
                    0 => setup_bar(i as i64),
                    1 => extended_bar(i as i64),
                    _ => bearish_bar(i as i64),
                })
                .collect();

            let full = evaluate(&intervals, &v).unwrap();
            let cut = intervals.len() / 2 + 1;
            let prefix = evaluate(&intervals[..cut], &v).unwrap();
            prop_assert_eq!(&prefix[..], &full[..cut]);
        }
    }
}
