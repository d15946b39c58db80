use error_stack::Report;
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, ensure_period};

/// RSI reported when the window has neither gains nor losses.
pub const FLAT_RSI: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RsiValue {
    pub period: usize,
    pub value: f64,
}

/// RSI (Relative Strength Index) using Wilder's smoothing method.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period, "period")?;
        Ok(Self { period })
    }
}

impl Indicator for Rsi {
    type Output = RsiValue;

    fn name(&self) -> &str {
        "rsi"
    }

    fn required_points(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, values: &[f64]) -> RsiValue {
        let period = self.period as f64;
        let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

        // Seed using simple average of first `period` gains/losses
        let (gain_sum, loss_sum) = deltas[..self.period]
            .iter()
            .fold((0.0, 0.0), |(g, l), &d| (g + d.max(0.0), l + (-d).max(0.0)));

        // Wilder smoothing for the remaining deltas
        let (avg_gain, avg_loss) = deltas[self.period..].iter().fold(
            (gain_sum / period, loss_sum / period),
            |(g, l), &d| {
                (
                    (g * (period - 1.0) + d.max(0.0)) / period,
                    (l * (period - 1.0) + (-d).max(0.0)) / period,
                )
            },
        );

        RsiValue {
            period: self.period,
            value: rsi_value(avg_gain, avg_loss),
        }
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { FLAT_RSI } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsi(period: usize, values: &[f64]) -> f64 {
        Rsi::new(period).unwrap().evaluate(values).unwrap().value
    }

    #[test]
    fn rsi_insufficient_data_is_omitted() {
        let rsi = Rsi::new(14).unwrap();
        assert!(rsi.evaluate(&[1.0; 14]).is_none());
        assert!(rsi.evaluate(&[1.0; 15]).is_some());
    }

    #[test]
    fn rsi_period_zero_invalid() {
        assert!(Rsi::new(0).is_err());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        assert_eq!(rsi(3, &[1.0, 2.0, 3.0, 4.0]), 100.0);
        let rising: Vec<f64> = (100..130).map(f64::from).collect();
        assert_eq!(rsi(14, &rising), 100.0);
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        assert!(rsi(3, &[4.0, 3.0, 2.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        assert_eq!(rsi(14, &[100.0; 20]), FLAT_RSI);
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        // +1, -1, +1, -1 -> avg_gain == avg_loss
        assert!((rsi(4, &[10.0, 11.0, 10.0, 11.0, 10.0]) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_wilder_smoothing_known_value() {
        // deltas: +2, -1 | +1. seed: gain 1.0, loss 0.5
        // smoothed: gain (1.0*1 + 1)/2 = 1.0, loss (0.5*1 + 0)/2 = 0.25
        // rs = 4 -> rsi = 80
        assert!((rsi(2, &[10.0, 12.0, 11.0, 12.0]) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_is_bounded() {
        let values: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 20.0 + (i as f64 * 0.11).cos() * 7.0)
            .collect();
        for end in 15..values.len() {
            let v = rsi(14, &values[..end]);
            assert!((0.0..=100.0).contains(&v), "rsi out of bounds: {v}");
        }
    }
}
