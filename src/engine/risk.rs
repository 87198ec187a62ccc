use crate::data::{Indicator, Interval};
use crate::strategy::{StopRule, Variant};
use serde::{Deserialize, Serialize};

//where the stop level came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    //padded reference value used as is
    Reference,
    //reference too close to (or above) entry, pulled down to the minimum distance
    Clamped,
    //reference unavailable, fixed-fraction stop
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitLevels {
    pub stop_price: f64,
    pub target_price: f64,
    pub stop_source: StopSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    //fraction below the reference value
    pub stop_pad: f64,
    //minimum stop distance as a fraction of entry
    pub min_stop_fraction: f64,
    //stop distance used when the reference cannot be computed
    pub fallback_stop_fraction: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            stop_pad: 0.001,
            min_stop_fraction: 0.001,
            fallback_stop_fraction: 0.015,
        }
    }
}

//computes stop and target levels for a long entry
//a pure function of (entry, window, variant): same inputs, same levels
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskManager {
    params: RiskParams,
}

impl RiskManager {
    pub fn new(params: RiskParams) -> Self {
        RiskManager { params }
    }

    //reference value selected by the variant's stop rule
    //window is the trailing slice of intervals ending at the entry interval
    fn reference_value(window: &[Interval], rule: StopRule) -> Option<f64> {
        let entry = window.last()?;
        let value = match rule {
            StopRule::BelowSlow => entry.indicator(Indicator::SlowMa)?,
            StopRule::SwingLow { lookback } => {
                if lookback == 0 || window.len() < lookback {
                    return None;
                }
                window[window.len() - lookback..]
                    .iter()
                    .map(|i| i.low)
                    .fold(f64::INFINITY, f64::min)
            }
        };

        (value.is_finite() && value > 0.0).then_some(value)
    }

    pub fn compute_exit_levels(
        &self,
        entry_price: f64,
        window: &[Interval],
        variant: &Variant,
    ) -> ExitLevels {
        let pad = self.params.stop_pad;
        let floor = -self.params.min_stop_fraction.abs();

        let computed = (entry_price.is_finite() && entry_price > 0.0)
            .then(|| Self::reference_value(window, variant.stop))
            .flatten();

        let (stop_price, stop_source) = match computed {
            Some(reference) => {
                let raw = reference * (1.0 - pad);
                let fraction = (raw - entry_price) / entry_price;
                if fraction <= floor {
                    (raw, StopSource::Reference)
                } else {
                    (entry_price * (1.0 + floor), StopSource::Clamped)
                }
            }
            None => {
                tracing::debug!(
                    variant = %variant.name,
                    entry_price,
                    "stop reference unavailable, using fixed-fraction stop"
                );
                (
                    entry_price * (1.0 - self.params.fallback_stop_fraction.abs()),
                    StopSource::Fallback,
                )
            }
        };

        let target_price = entry_price + variant.tp_multiple * (entry_price - stop_price);

        ExitLevels {
            stop_price,
            target_price,
            stop_source,
        }
    }
}
