use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, ensure_period, mean};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeValue {
    pub period: usize,
    pub average: f64,
    /// Latest volume divided by the average; absent when the average is zero.
    pub relative: Option<f64>,
    pub surge: bool,
}

/// Simple average of trading volume over a period.
#[derive(Debug, Clone, Copy)]
pub struct VolumeMa {
    period: usize,
    surge_multiplier: f64,
}

impl VolumeMa {
    pub fn new(period: usize, surge_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period, "period")?;
        if !(surge_multiplier > 0.0) {
            bail!(IndicatorError::InvalidParameter {
                name: "surge_multiplier must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            surge_multiplier,
        })
    }
}

impl Indicator for VolumeMa {
    type Output = VolumeValue;

    fn name(&self) -> &str {
        "volume_ma"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    /// Operates on volumes, not closes.
    fn compute(&self, volumes: &[f64]) -> VolumeValue {
        let average = mean(&volumes[volumes.len() - self.period..]);
        let current = volumes[volumes.len() - 1];
        let relative = (average > 0.0).then(|| current / average);
        VolumeValue {
            period: self.period,
            average,
            relative,
            surge: relative.is_some_and(|r| r > self.surge_multiplier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_ma_invalid_parameters() {
        assert!(VolumeMa::new(0, 2.0).is_err());
        assert!(VolumeMa::new(5, 0.0).is_err());
    }

    #[test]
    fn volume_ma_insufficient_data_is_omitted() {
        let vma = VolumeMa::new(5, 2.0).unwrap();
        assert!(vma.evaluate(&[1.0; 4]).is_none());
    }

    #[test]
    fn volume_ma_known_value() {
        let vma = VolumeMa::new(3, 2.0).unwrap();
        // (2+3+4)/3 = 3.0, last 4.0
        let value = vma.evaluate(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((value.average - 3.0).abs() < 1e-9);
        assert!((value.relative.unwrap() - 4.0 / 3.0).abs() < 1e-9);
        assert!(!value.surge);
    }

    #[test]
    fn surge_detection() {
        let vma = VolumeMa::new(3, 2.0).unwrap();
        // window [1,1,7]: ma = 3, current = 7 -> 2.33x
        let value = vma.evaluate(&[1.0, 1.0, 1.0, 7.0]).unwrap();
        assert!(value.surge);
    }

    #[test]
    fn zero_volume_has_no_relative_reading() {
        let vma = VolumeMa::new(3, 2.0).unwrap();
        let value = vma.evaluate(&[0.0; 3]).unwrap();
        assert_eq!(value.relative, None);
        assert!(!value.surge);
    }
}
