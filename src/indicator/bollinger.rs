use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, ensure_period, mean, population_std_dev};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerValue {
    pub period: usize,
    pub std_dev_multiplier: f64,
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period, "period")?;
        if !(std_dev_multiplier > 0.0) {
            bail!(IndicatorError::InvalidParameter {
                name: "std_dev_multiplier must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }
}

impl Indicator for BollingerBands {
    type Output = BollingerValue;

    fn name(&self) -> &str {
        "bollinger"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    fn compute(&self, values: &[f64]) -> BollingerValue {
        let window = &values[values.len() - self.period..];
        let middle = mean(window);
        let width = self.std_dev_multiplier * population_std_dev(window, middle);
        BollingerValue {
            period: self.period,
            std_dev_multiplier: self.std_dev_multiplier,
            upper: middle + width,
            middle,
            lower: middle - width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::ma::Sma;

    #[test]
    fn bollinger_period_zero_invalid() {
        assert!(BollingerBands::new(0, 2.0).is_err());
    }

    #[test]
    fn bollinger_negative_multiplier_invalid() {
        assert!(BollingerBands::new(20, -1.0).is_err());
        assert!(BollingerBands::new(20, f64::NAN).is_err());
    }

    #[test]
    fn bollinger_insufficient_data_is_omitted() {
        let bb = BollingerBands::new(20, 2.0).unwrap();
        assert!(bb.evaluate(&[1.0; 10]).is_none());
    }

    #[test]
    fn bollinger_flat_prices_zero_width() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let bands = bb.evaluate(&[10.0_f64; 5]).unwrap();
        assert!((bands.upper - 10.0).abs() < 1e-9);
        assert!((bands.middle - 10.0).abs() < 1e-9);
        assert!((bands.lower - 10.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_known_value() {
        // window [2,4,4,4,5,5,7,9]: mean 5, population sd 2
        let bb = BollingerBands::new(8, 2.0).unwrap();
        let bands = bb
            .evaluate(&[100.0, 2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
            .unwrap();
        assert!((bands.middle - 5.0).abs() < 1e-9);
        assert!((bands.upper - 9.0).abs() < 1e-9);
        assert!((bands.lower - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_middle_equals_sma() {
        let values: Vec<f64> = (0..50).map(|i| 20.0 + (i as f64 * 0.9).sin() * 3.0).collect();
        for period in 1..=40 {
            let bands = BollingerBands::new(period, 2.0)
                .unwrap()
                .evaluate(&values)
                .unwrap();
            let sma = Sma::new(period).unwrap().evaluate(&values).unwrap();
            assert_eq!(bands.middle, sma);
            assert!((bands.upper - bands.middle - (bands.middle - bands.lower)).abs() < 1e-9);
        }
    }
}
