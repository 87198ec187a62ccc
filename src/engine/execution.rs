use crate::data::Interval;
use crate::portfolio::{ExitReason, OpenPosition};
use crate::strategy::ExitRule;

//a triggered exit: why and at what price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub reason: ExitReason,
    pub price: f64,
}

//checks one interval after entry against the position's levels and the exit rule
//priority within an interval: stop, then target, then the rule exit
//fast/slow are the interval's resolved references
pub fn check_exit(
    position: &OpenPosition,
    interval: &Interval,
    fast: f64,
    slow: f64,
    rule: ExitRule,
) -> Option<ExitFill> {
    let levels = &position.levels;

    //stop sell triggers if low <= stop, evaluated first to stay conservative
    if interval.low <= levels.stop_price {
        return Some(ExitFill {
            reason: ExitReason::StopHit,
            price: levels.stop_price,
        });
    }

    //take-profit limit fills if high >= target
    if interval.high >= levels.target_price {
        return Some(ExitFill {
            reason: ExitReason::TargetHit,
            price: levels.target_price,
        });
    }

    //rule exits fill at the close
    if rule.fires(interval, fast, slow) {
        return Some(ExitFill {
            reason: ExitReason::RuleExit,
            price: interval.close,
        });
    }

    None
}
