//! Support/resistance extraction from local extrema of the close series.
//!
//! A close is a local maximum (minimum) when it is the highest (lowest) value in
//! the window `[i - radius, i + radius]`, clipped to the series bounds. Flat
//! windows never produce an extremum, so a constant series yields no levels.

use serde::Serialize;

use crate::config::LevelsConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportResistance {
    /// Levels below the latest close, nearest first.
    pub support: Vec<f64>,
    /// Levels above the latest close, nearest first.
    pub resistance: Vec<f64>,
}

/// Lowest and highest close over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub window: usize,
    pub low: f64,
    pub high: f64,
}

pub fn extract_levels(closes: &[f64], config: &LevelsConfig) -> SupportResistance {
    let Some(&current) = closes.last() else {
        return SupportResistance::default();
    };

    let (maxima, minima) = local_extrema(closes, config.radius);
    // Side filter first: a candidate at the latest close must not absorb a real level.
    let above = on_side(&maxima, current, Side::Above);
    let below = on_side(&minima, current, Side::Below);
    let resistance = dedupe_newest_first(&above, config.tolerance);
    let support = dedupe_newest_first(&below, config.tolerance);

    SupportResistance {
        support: nearest(support, current, config.max_levels),
        resistance: nearest(resistance, current, config.max_levels),
    }
}

/// Min/max close over the last `window` points (fewer if the series is shorter).
pub fn recent_range(closes: &[f64], window: usize) -> Option<PriceRange> {
    let tail = &closes[closes.len().saturating_sub(window)..];
    if tail.is_empty() {
        return None;
    }
    let (low, high) = tail
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    Some(PriceRange {
        window: tail.len(),
        low,
        high,
    })
}

/// Returns `(maxima, minima)` in chronological order.
fn local_extrema(closes: &[f64], radius: usize) -> (Vec<f64>, Vec<f64>) {
    let mut maxima = Vec::new();
    let mut minima = Vec::new();
    let last = closes.len().saturating_sub(1);

    for (i, &value) in closes.iter().enumerate() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(last);
        if lo == hi {
            continue;
        }
        let (min, max) = closes[lo..=hi]
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), &v| {
                (mn.min(v), mx.max(v))
            });
        if min == max {
            continue;
        }
        if value == max {
            maxima.push(value);
        } else if value == min {
            minima.push(value);
        }
    }

    (maxima, minima)
}

fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Walks candidates newest to oldest, discarding any within `tolerance` of one
/// already kept.
fn dedupe_newest_first(chronological: &[f64], tolerance: f64) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::new();
    for &level in chronological.iter().rev() {
        if !kept.iter().any(|&k| within_tolerance(level, k, tolerance)) {
            kept.push(level);
        }
    }
    kept
}

#[derive(Clone, Copy)]
enum Side {
    Above,
    Below,
}

/// Keeps chronological order.
fn on_side(candidates: &[f64], current: f64, side: Side) -> Vec<f64> {
    candidates
        .iter()
        .copied()
        .filter(|&l| match side {
            Side::Above => l > current,
            Side::Below => l < current,
        })
        .collect()
}

fn nearest(mut selected: Vec<f64>, current: f64, cap: usize) -> Vec<f64> {
    selected.sort_by(|a, b| (a - current).abs().total_cmp(&(b - current).abs()));
    selected.truncate(cap);
    selected
}
