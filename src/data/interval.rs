use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("interval {index}: invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { index: usize, high: f64, low: f64 },
    #[error("interval {index}: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose {
        index: usize,
        close: f64,
        high: f64,
        low: f64,
    },
    #[error("interval {index}: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen {
        index: usize,
        open: f64,
        high: f64,
        low: f64,
    },
    #[error("interval {index}: {field} is not a finite number ({value})")]
    NonFinitePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("interval {index}: non-positive price ({price})")]
    NonPositivePrice { index: usize, price: f64 },
    #[error("interval {index}: negative volume ({volume})")]
    NegativeVolume { index: usize, volume: f64 },
    #[error("interval {index}: timestamp {timestamp} is not after the previous interval")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
    },
    #[error("interval {index} ({timestamp}): missing indicator '{name}'")]
    MissingIndicator {
        index: usize,
        timestamp: DateTime<Utc>,
        name: &'static str,
    },
    #[error("interval {index} ({timestamp}): indicator '{name}' is not a finite number ({value})")]
    NonFiniteIndicator {
        index: usize,
        timestamp: DateTime<Utc>,
        name: &'static str,
        value: f64,
    },
}

//coarser aggregation whose moving averages are attached to every interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M15,
    H1,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::M15 => write!(f, "15m"),
            Timeframe::H1 => write!(f, "1h"),
        }
    }
}

//indicator columns the rule engine reads
//anything else on an interval (rsi, atr, volume baselines) is carried but never interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    FastMa,
    SlowMa,
    HtfFastMa(Timeframe),
    HtfSlowMa(Timeframe),
}

impl Indicator {
    //column name in the indicator frame
    pub fn name(&self) -> &'static str {
        match self {
            Indicator::FastMa => "ema_fast",
            Indicator::SlowMa => "ema_slow",
            Indicator::HtfFastMa(Timeframe::M15) => "ema_fast_15m",
            Indicator::HtfSlowMa(Timeframe::M15) => "ema_slow_15m",
            Indicator::HtfFastMa(Timeframe::H1) => "ema_fast_1h",
            Indicator::HtfSlowMa(Timeframe::H1) => "ema_slow_1h",
        }
    }
}

//one ohlcv interval (candle) plus its precomputed indicator values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interval {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub indicators: IndexMap<String, f64>,
}

impl Interval {
    //creates an interval without indicators
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Interval {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            indicators: IndexMap::new(),
        }
    }

    //builder-style indicator attachment
    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    //raw lookup, none when the column is absent or not finite
    pub fn indicator(&self, indicator: Indicator) -> Option<f64> {
        self.indicators
            .get(indicator.name())
            .copied()
            .filter(|v| v.is_finite())
    }

    //strict lookup used by the evaluator; a gap here is a data-contract violation
    pub fn require(&self, indicator: Indicator, index: usize) -> Result<f64, DataError> {
        let name = indicator.name();
        match self.indicators.get(name) {
            None => Err(DataError::MissingIndicator {
                index,
                timestamp: self.timestamp,
                name,
            }),
            Some(&value) if !value.is_finite() => Err(DataError::NonFiniteIndicator {
                index,
                timestamp: self.timestamp,
                name,
                value,
            }),
            Some(&value) => Ok(value),
        }
    }

    //checks ohlcv sanity, the index is only used for error reporting
    pub fn validate(&self, index: usize) -> Result<(), DataError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        if let Some(&(field, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DataError::NonFinitePrice {
                index,
                field,
                value,
            });
        }

        if self.high < self.low {
            return Err(DataError::InvalidHighLow {
                index,
                high: self.high,
                low: self.low,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(DataError::InvalidClose {
                index,
                close: self.close,
                high: self.high,
                low: self.low,
            });
        }

        if self.open < self.low || self.open > self.high {
            return Err(DataError::InvalidOpen {
                index,
                open: self.open,
                high: self.high,
                low: self.low,
            });
        }

        //low is the minimum of the four once the checks above pass
        if self.low <= 0.0 {
            return Err(DataError::NonPositivePrice {
                index,
                price: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(DataError::NegativeVolume {
                index,
                volume: self.volume,
            });
        }

        Ok(())
    }

    //close strictly above open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    //close strictly below open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

}
