use crate::data::interval::{DataError, Indicator, Interval};
use std::ops::Deref;

//validated, time-ordered sequence of intervals
//never mutated once built, so variants can share it across threads
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    intervals: Vec<Interval>,
}

impl IndicatorFrame {
    //validates ohlcv sanity and strict timestamp ordering
    pub fn new(intervals: Vec<Interval>) -> Result<Self, DataError> {
        for (index, interval) in intervals.iter().enumerate() {
            interval.validate(index)?;

            if index > 0 && interval.timestamp <= intervals[index - 1].timestamp {
                return Err(DataError::OutOfOrder {
                    index,
                    timestamp: interval.timestamp,
                });
            }
        }

        Ok(IndicatorFrame { intervals })
    }

    //fail-fast check that every interval carries the given indicators as finite numbers
    pub fn require(&self, indicators: &[Indicator]) -> Result<(), DataError> {
        for (index, interval) in self.intervals.iter().enumerate() {
            for &indicator in indicators {
                interval.require(indicator, index)?;
            }
        }
        Ok(())
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }
}

impl Deref for IndicatorFrame {
    type Target = [Interval];

    fn deref(&self) -> &Self::Target {
        &self.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn interval(minutes: i64) -> Interval {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        Interval::new(ts, 10.0, 10.5, 9.5, 10.2, 50.0)
            .with_indicator("ema_fast", 10.0)
            .with_indicator("ema_slow", 9.8)
    }

    #[test]
    fn accepts_ordered_intervals() {
        let frame = IndicatorFrame::new(vec![interval(0), interval(5), interval(10)]).unwrap();
        assert_eq!(frame.len(), 3);
        assert!(frame
            .require(&[Indicator::FastMa, Indicator::SlowMa])
            .is_ok());
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let err = IndicatorFrame::new(vec![interval(0), interval(5), interval(5)]).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { index: 2, .. }));
    }

    #[test]
    fn require_fails_fast_on_first_gap() {
        let mut intervals = vec![interval(0), interval(5), interval(10)];
        intervals[1].indicators.shift_remove("ema_slow");
        let frame = IndicatorFrame::new(intervals).unwrap();

        let err = frame
            .require(&[Indicator::FastMa, Indicator::SlowMa])
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingIndicator {
                index: 1,
                name: "ema_slow",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_finite_prices() {
        let mut intervals = vec![interval(0), interval(5), interval(10)];
        intervals[1].high = f64::NAN;
        intervals[1].close = f64::NAN;
        let err = IndicatorFrame::new(intervals).unwrap_err();
        assert!(matches!(
            err,
            DataError::NonFinitePrice {
                index: 1,
                field: "high",
                ..
            }
        ));

        let mut intervals = vec![interval(0), interval(5)];
        intervals[0].high = f64::INFINITY;
        assert!(matches!(
            IndicatorFrame::new(intervals),
            Err(DataError::NonFinitePrice { index: 0, .. })
        ));
    }
}
