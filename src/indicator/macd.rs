use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::ma::Ema;

/// Latest MACD reading. `signal` and `histogram` are absent when the series
/// covers the slow EMA but not the signal smoothing on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdValue {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    pub macd: f64,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        if fast_period >= slow_period {
            bail!(IndicatorError::InvalidParameter {
                name: "fast_period must be < slow_period".into(),
            });
        }
        Ok(Self {
            fast: Ema::new(fast_period)?,
            slow: Ema::new(slow_period)?,
            signal: Ema::new(signal_period)?,
        })
    }

    /// Points needed before the signal line and histogram are reported.
    pub fn signal_required_points(&self) -> usize {
        self.slow.period() + self.signal.period()
    }

    /// MACD line at every point where both EMAs are defined, oldest first.
    pub fn line(&self, values: &[f64]) -> Vec<f64> {
        let fast = self.fast.series(values);
        let slow = self.slow.series(values);
        // fast is longer by (slow_period - fast_period) elements
        let offset = self.slow.period() - self.fast.period();
        fast.get(offset..)
            .unwrap_or_default()
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| f - s)
            .collect()
    }
}

impl Indicator for Macd {
    type Output = MacdValue;

    fn name(&self) -> &str {
        "macd"
    }

    fn required_points(&self) -> usize {
        self.slow.period()
    }

    fn compute(&self, values: &[f64]) -> MacdValue {
        let line = self.line(values);
        let macd = line[line.len() - 1];
        let signal = (values.len() >= self.signal_required_points())
            .then(|| self.signal.compute(&line));

        MacdValue {
            fast_period: self.fast.period(),
            slow_period: self.slow.period(),
            signal_period: self.signal.period(),
            macd,
            signal,
            histogram: signal.map(|s| macd - s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_invalid_fast_ge_slow() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert!(Macd::new(12, 12, 9).is_err());
    }

    #[test]
    fn macd_period_zero_invalid() {
        assert!(Macd::new(0, 26, 9).is_err());
        assert!(Macd::new(12, 26, 0).is_err());
    }

    #[test]
    fn macd_insufficient_data_is_omitted() {
        let macd = Macd::new(12, 26, 9).unwrap();
        assert!(macd.evaluate(&[1.0; 25]).is_none());
    }

    #[test]
    fn macd_line_only_below_signal_window() {
        let macd = Macd::new(12, 26, 9).unwrap();
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let value = macd.evaluate(&values).unwrap();
        assert!(value.macd > 0.0);
        assert_eq!(value.signal, None);
        assert_eq!(value.histogram, None);
    }

    #[test]
    fn macd_full_reading_at_signal_window() {
        let macd = Macd::new(12, 26, 9).unwrap();
        let values: Vec<f64> = (0..35).map(|i| 50.0 + (i as f64 * 0.4).sin()).collect();
        let value = macd.evaluate(&values).unwrap();
        assert!(value.signal.is_some());
        assert_eq!(value.histogram, Some(value.macd - value.signal.unwrap()));
    }

    #[test]
    fn macd_flat_prices_returns_zero() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let value = macd.evaluate(&[10.0_f64; 10]).unwrap();
        assert!(value.macd.abs() < 1e-9);
        assert!(value.signal.unwrap().abs() < 1e-9);
        assert!(value.histogram.unwrap().abs() < 1e-9);
    }

    #[test]
    fn macd_line_aligns_fast_and_slow() {
        let macd = Macd::new(2, 4, 2).unwrap();
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let line = macd.line(&values);
        assert_eq!(line.len(), values.len() - 4 + 1);
        let value = macd.evaluate(&values).unwrap();
        assert_eq!(value.macd, *line.last().unwrap());
    }

    #[test]
    fn histogram_identity_holds_across_lengths() {
        let macd = Macd::new(12, 26, 9).unwrap();
        let values: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 8.0)
            .collect();
        for end in macd.signal_required_points()..values.len() {
            let value = macd.evaluate(&values[..end]).unwrap();
            assert_eq!(value.histogram, Some(value.macd - value.signal.unwrap()));
        }
    }
}
