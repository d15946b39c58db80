//! In-memory provider used by tests.

use chrono::{Duration, TimeZone, Utc};
use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ProviderError;
use crate::model::{AssetId, HistoryWindow, MarketSnapshot, RawSample};
use crate::provider::MarketDataProvider;

pub struct FakeProvider {
    asset: AssetId,
    samples: Vec<RawSample>,
    snapshot: MarketSnapshot,
    series_error: Option<ProviderError>,
}

impl FakeProvider {
    /// A provider knowing one asset with daily `closes` starting 2024-01-01.
    pub fn with_closes(symbol: &str, closes: &[f64]) -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let samples = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| RawSample::close_only(start + Duration::days(i as i64), c, Some(1_000.0)))
            .collect();
        let symbol = symbol.to_uppercase();

        Self {
            asset: AssetId {
                id: symbol.to_lowercase(),
                symbol: symbol.clone(),
                name: format!("{symbol} Coin"),
            },
            samples,
            snapshot: MarketSnapshot {
                name: format!("{symbol} Coin"),
                symbol,
                price: closes.last().copied().unwrap_or_default(),
                market_cap: 1_250_000_000.0,
                volume_24h: 48_000_000.0,
                circulating_supply: Some(19_500_000.0),
                total_supply: None,
                utility_description: "A test asset.".into(),
            },
            series_error: None,
        }
    }

    pub fn failing_series(self) -> Self {
        self.failing_series_with(ProviderError::Request {
            provider: "fake".into(),
        })
    }

    /// Every series fetch fails with `error`.
    pub fn failing_series_with(mut self, error: ProviderError) -> Self {
        self.series_error = Some(error);
        self
    }
}

impl MarketDataProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn resolve_asset(&self, symbol: &str) -> BoxFuture<'_, Result<AssetId, Report<ProviderError>>> {
        let result = if symbol.eq_ignore_ascii_case(&self.asset.symbol) {
            Ok(self.asset.clone())
        } else {
            Err(Report::new(ProviderError::UnknownAsset {
                symbol: symbol.to_owned(),
            }))
        };
        Box::pin(async move { result })
    }

    fn fetch_series(
        &self,
        _asset: &AssetId,
        _window: HistoryWindow,
    ) -> BoxFuture<'_, Result<Vec<RawSample>, Report<ProviderError>>> {
        Box::pin(async move {
            if let Some(error) = &self.series_error {
                return Err(Report::new(error.clone()));
            }
            Ok(self.samples.clone())
        })
    }

    fn fetch_snapshot(
        &self,
        _asset: &AssetId,
    ) -> BoxFuture<'_, Result<MarketSnapshot, Report<ProviderError>>> {
        Box::pin(async move { Ok(self.snapshot.clone()) })
    }
}
