use serde::{Deserialize, Serialize};

//a point in the proxy equity curve, one per closed trade
//all values are in percentage-equity units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub index: usize,
    pub cumulative: f64,
    pub peak: f64,
    pub drawdown: f64,
}

//running cumulative sum of profits with its running peak
//the curve starts flat at zero, so an opening loss is already a drawdown
pub fn calculate_equity_curve(profits: &[f64]) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(profits.len());
    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;

    for (index, &profit) in profits.iter().enumerate() {
        cumulative += profit;
        peak = peak.max(cumulative);

        curve.push(EquityPoint {
            index,
            cumulative,
            peak,
            drawdown: peak - cumulative,
        });
    }

    curve
}

//calculates maximum drawdown from equity curve
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::max)
}
