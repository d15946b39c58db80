use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, ensure_period, mean};

/// Simple Moving Average.
#[derive(Debug, Clone, Copy)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period, "period")?;
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn name(&self) -> &str {
        "sma"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    fn compute(&self, values: &[f64]) -> f64 {
        mean(&values[values.len() - self.period..])
    }
}

/// Exponential Moving Average, seeded with the SMA of the first `period` values.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period, "period")?;
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }

    /// Every defined EMA value, oldest first.
    ///
    /// The first element corresponds to `values[period - 1]`; the result is empty
    /// when `values` is shorter than the period.
    pub fn series(&self, values: &[f64]) -> Vec<f64> {
        if values.len() < self.period {
            return Vec::new();
        }
        let alpha = self.alpha();
        let seed = mean(&values[..self.period]);
        std::iter::once(seed)
            .chain(values[self.period..].iter().scan(seed, move |ema, &v| {
                *ema = v * alpha + *ema * (1.0 - alpha);
                Some(*ema)
            }))
            .collect()
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn name(&self) -> &str {
        "ema"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    fn compute(&self, values: &[f64]) -> f64 {
        let alpha = self.alpha();
        let seed = mean(&values[..self.period]);
        values[self.period..]
            .iter()
            .fold(seed, |ema, &v| v * alpha + ema * (1.0 - alpha))
    }
}
