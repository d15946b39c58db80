use error_stack::{Report, bail};
use tracing::debug;

use crate::error::AnalysisError;
use crate::model::{PricePoint, RawSample};

/// Longest lookback among the default indicators (MACD slow EMA).
pub const DEFAULT_MIN_POINTS: usize = 26;

/// A validated price series: ascending by timestamp, no duplicate timestamps.
///
/// Only [`normalize`] can build one, so every `PriceSeries` upholds the ordering
/// invariant that the indicators rely on.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }
}

/// Sort, deduplicate and validate raw provider samples.
///
/// Samples without a usable close are dropped; missing open/high/low fall back
/// to the close and a missing volume to zero. When several samples share a
/// timestamp the one that appears last in `raw` wins.
pub fn normalize(
    raw: Vec<RawSample>,
    min_points: usize,
) -> Result<PriceSeries, Report<AnalysisError>> {
    let received = raw.len();
    let mut points: Vec<PricePoint> = raw.into_iter().filter_map(into_point).collect();
    let unusable = received - points.len();

    // Stable sort: samples with equal timestamps keep their fetch order.
    points.sort_by_key(|p| p.timestamp);

    let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => deduped.push(point),
        }
    }

    debug!(
        received,
        unusable,
        kept = deduped.len(),
        "normalized price series"
    );

    if deduped.len() < min_points {
        bail!(AnalysisError::InsufficientData {
            required: min_points,
            available: deduped.len(),
        });
    }

    Ok(PriceSeries { points: deduped })
}

fn into_point(raw: RawSample) -> Option<PricePoint> {
    let close = raw.close.filter(|c| c.is_finite())?;
    let or_close = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(close);
    Some(PricePoint {
        timestamp: raw.timestamp,
        open: or_close(raw.open),
        high: or_close(raw.high),
        low: or_close(raw.low),
        close,
        volume: raw.volume.filter(|v| v.is_finite()).unwrap_or(0.0),
    })
}
