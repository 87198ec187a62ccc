use crate::data::{Indicator, Timeframe};
use crate::strategy::rules::{
    ConfirmationRule, ExitRule, PullbackRule, SessionGate, SlopeRule, StopRule, TrendFilter,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("variant '{variant}': {reason}")]
    InvalidVariant { variant: String, reason: String },
    #[error("registry key '{key}' does not match variant name '{name}'")]
    KeyMismatch { key: String, name: String },
    #[error("registry has no default variant '{0}'")]
    MissingDefault(String),
    #[error("registry is empty")]
    EmptyRegistry,
}

//optional extra precondition on top of the family rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Extension {
    #[default]
    None,
    //fast/slow spread below threshold (fraction of close) for every interval of the window
    Compression { threshold: f64, length: usize },
    //late entry: close above fast for `length` intervals and low within pad of fast
    //replaces the pullback rule
    Continuation { length: usize, near_fast_pad: f64 },
}

//disqualifies a signal after a recent run of bearish closes below fast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearishGuard {
    pub window: usize,
    pub run_length: usize,
}

impl Default for BearishGuard {
    fn default() -> Self {
        BearishGuard {
            window: 10,
            run_length: 3,
        }
    }
}

//one named, immutable combination of rule selections and risk parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pullback: PullbackRule,
    pub confirmation: ConfirmationRule,
    pub trend_filter: TrendFilter,
    pub slope: SlopeRule,
    pub session: SessionGate,
    pub stop: StopRule,
    pub exit: ExitRule,
    pub tp_multiple: f64,
    #[serde(default)]
    pub extension: Extension,
    #[serde(default)]
    pub bearish_guard: BearishGuard,
}

impl Variant {
    //indicator columns the evaluator and simulator will read for this variant
    pub fn required_indicators(&self) -> Vec<Indicator> {
        let mut required = vec![Indicator::FastMa, Indicator::SlowMa];

        let mut push_htf = |tf: Timeframe| {
            for indicator in [Indicator::HtfFastMa(tf), Indicator::HtfSlowMa(tf)] {
                if !required.contains(&indicator) {
                    required.push(indicator);
                }
            }
        };

        if let TrendFilter::HigherTimeframe(tf) = self.trend_filter {
            push_htf(tf);
        }
        if self.session == SessionGate::HigherTimeframeTrend {
            push_htf(Timeframe::M15);
        }

        required
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidVariant {
            variant: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if !self.tp_multiple.is_finite() || self.tp_multiple < 1.0 {
            return Err(invalid(format!(
                "tp_multiple must be a finite number >= 1, got {}",
                self.tp_multiple
            )));
        }
        if let ConfirmationRule::ConsecutiveBullish { count: 0 } = self.confirmation {
            return Err(invalid("confirmation count must be at least 1".to_string()));
        }
        if let StopRule::SwingLow { lookback: 0 } = self.stop {
            return Err(invalid("swing-low lookback must be at least 1".to_string()));
        }
        if let SessionGate::Window { start, end } = self.session {
            if start > end {
                return Err(invalid(format!("session window {} > {}", start, end)));
            }
        }

        match self.extension {
            Extension::None => {}
            Extension::Compression { threshold, length } => {
                if length == 0 || !threshold.is_finite() || threshold <= 0.0 {
                    return Err(invalid(format!(
                        "compression needs length >= 1 and threshold > 0, got {} / {}",
                        length, threshold
                    )));
                }
            }
            Extension::Continuation {
                length,
                near_fast_pad,
            } => {
                if length == 0 || !near_fast_pad.is_finite() || near_fast_pad < 0.0 {
                    return Err(invalid(format!(
                        "continuation needs length >= 1 and pad >= 0, got {} / {}",
                        length, near_fast_pad
                    )));
                }
            }
        }

        let guard = self.bearish_guard;
        if guard.run_length == 0 || guard.run_length > guard.window {
            return Err(invalid(format!(
                "bearish guard run length {} must be within 1..={}",
                guard.run_length, guard.window
            )));
        }

        Ok(())
    }
}
