use std::fmt;

use serde::Serialize;

/// Sparkline alphabet, lowest level first.
pub const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Level used for every point when the window has no range.
pub const MIDDLE_LEVEL: usize = (GLYPHS.len() - 1) / 2;

/// Rescaled closing-price trajectory, oldest glyph first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrendGlyphs(String);

impl TrendGlyphs {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of glyphs (not bytes).
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrendGlyphs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render the last `width` closes as a sparkline.
pub fn render(closes: &[f64], width: usize) -> TrendGlyphs {
    let tail = &closes[closes.len().saturating_sub(width)..];
    let (min, max) = tail
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let top = (GLYPHS.len() - 1) as f64;

    let glyphs = tail
        .iter()
        .map(|&v| {
            let level = if max > min {
                (((v - min) / (max - min)) * top).round() as usize
            } else {
                MIDDLE_LEVEL
            };
            GLYPHS[level.min(GLYPHS.len() - 1)]
        })
        .collect();

    TrendGlyphs(glyphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render(&[], 60).is_empty());
    }

    #[test]
    fn constant_series_is_all_middle() {
        let glyphs = render(&[50.0; 5], 60);
        assert_eq!(glyphs.as_str(), "▄▄▄▄▄");
    }

    #[test]
    fn length_matches_width_when_series_is_longer() {
        let closes: Vec<f64> = (0..500).map(|i| (i as f64 * 0.1).sin()).collect();
        for width in [1, 8, 60, 499, 500] {
            assert_eq!(render(&closes, width).len(), width);
        }
        assert_eq!(render(&closes[..10], 60).len(), 10);
    }

    #[test]
    fn ascending_series_spans_full_alphabet() {
        let closes: Vec<f64> = (0..8).map(f64::from).collect();
        assert_eq!(render(&closes, 8).as_str(), "▁▂▃▄▅▆▇█");
    }

    #[test]
    fn uses_only_the_last_window() {
        // the spike is outside the window and must not flatten the scale
        let mut closes = vec![1_000.0];
        closes.extend([1.0, 2.0]);
        assert_eq!(render(&closes, 2).as_str(), "▁█");
    }
}
