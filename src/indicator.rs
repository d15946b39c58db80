pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod volume;

use std::collections::BTreeMap;

use error_stack::{Report, bail};
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::IndicatorError;
use crate::series::PriceSeries;
use bollinger::{BollingerBands, BollingerValue};
use ma::{Ema, Sma};
use macd::{Macd, MacdValue};
use rsi::{Rsi, RsiValue};
use volume::{VolumeMa, VolumeValue};

/// A technical analysis indicator evaluated at the last point of a series.
///
/// Values must be in ascending chronological order (oldest first).
/// Implementations are stateless; evaluating twice on the same input yields
/// the same output.
pub trait Indicator {
    type Output;

    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of values required to produce an output.
    fn required_points(&self) -> usize;

    /// Compute the value as of the last element of `values`.
    ///
    /// Callers must guarantee `values.len() >= self.required_points()`;
    /// use [`Indicator::evaluate`] when that is not already checked.
    fn compute(&self, values: &[f64]) -> Self::Output;

    /// Compute the latest value, or `None` when `values` is too short.
    fn evaluate(&self, values: &[f64]) -> Option<Self::Output> {
        let required = self.required_points();
        if values.len() < required {
            debug!(
                indicator = self.name(),
                available = values.len(),
                required,
                "insufficient points for indicator"
            );
            return None;
        }
        Some(self.compute(values))
    }
}

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around a precomputed mean.
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn ensure_period(period: usize, label: &str) -> Result<(), Report<IndicatorError>> {
    if period == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: format!("{label} must be > 0"),
        });
    }
    Ok(())
}

/// Latest indicator values for one series.
///
/// An absent entry means the series was too short for that indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    /// SMA value keyed by configured period; `None` when the series is too short.
    pub sma: BTreeMap<usize, Option<f64>>,
    /// EMA value keyed by configured period; `None` when the series is too short.
    pub ema: BTreeMap<usize, Option<f64>>,
    pub rsi: Option<RsiValue>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerValue>,
    pub volume: Option<VolumeValue>,
}

/// The configured set of indicators, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct IndicatorBank {
    sma: Vec<Sma>,
    ema: Vec<Ema>,
    rsi: Rsi,
    macd: Macd,
    bollinger: BollingerBands,
    volume: VolumeMa,
}

impl IndicatorBank {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, Report<IndicatorError>> {
        let sma = config
            .sma_periods
            .iter()
            .map(|&p| Sma::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let ema = config
            .ema_periods
            .iter()
            .map(|&p| Ema::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sma,
            ema,
            rsi: Rsi::new(config.rsi_period)?,
            macd: Macd::new(config.macd.fast, config.macd.slow, config.macd.signal)?,
            bollinger: BollingerBands::new(
                config.bollinger.period,
                config.bollinger.std_dev_multiplier,
            )?,
            volume: VolumeMa::new(config.volume.period, config.volume.surge_multiplier)?,
        })
    }

    /// Evaluate every indicator independently against the same series.
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSnapshot {
        let closes = series.closes();
        let volumes = series.volumes();

        IndicatorSnapshot {
            sma: self
                .sma
                .iter()
                .map(|i| (i.period(), i.evaluate(&closes)))
                .collect(),
            ema: self
                .ema
                .iter()
                .map(|i| (i.period(), i.evaluate(&closes)))
                .collect(),
            rsi: self.rsi.evaluate(&closes),
            macd: self.macd.evaluate(&closes),
            bollinger: self.bollinger.evaluate(&closes),
            volume: self.volume.evaluate(&volumes),
        }
    }
}
