use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sampling interval of a historical price series.
///
/// String representations match the config file format (`"1h"`, `"1d"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    /// Parse a config-format string into a `Granularity`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(Self::Hourly),
            "1d" => Some(Self::Daily),
            _ => None,
        }
    }

    /// Return the config-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "1h",
            Self::Daily => "1d",
        }
    }

    /// Return the CoinGecko `interval` query value, if the granularity needs one.
    ///
    /// Hourly data is what CoinGecko returns on its own for windows of 2-90 days.
    pub fn coingecko_interval(self) -> Option<&'static str> {
        match self {
            Self::Hourly => None,
            Self::Daily => Some("daily"),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub days: u32,
    pub granularity: Granularity,
}

/// How much of the analysis a caller wants rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportMode {
    Overview,
    Full,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overview => write!(f, "overview"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Provider-resolved identity of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetId {
    /// Provider-specific id (e.g. `"bitcoin"`).
    pub id: String,
    /// Upper-case ticker (e.g. `"BTC"`).
    pub symbol: String,
    pub name: String,
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.id)
    }
}

/// A sample as delivered by a provider, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawSample {
    /// A close-only sample, as returned by endpoints without OHLC data.
    #[cfg(test)]
    pub fn close_only(timestamp: DateTime<Utc>, close: f64, volume: Option<f64>) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close: Some(close),
            volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Point-in-time market fields, passed through to the report unmodified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub utility_description: String,
}
