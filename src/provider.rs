pub mod coingecko;
#[cfg(test)]
pub mod fake;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ProviderError;
use crate::model::{AssetId, HistoryWindow, MarketSnapshot, RawSample};

/// Source of historical prices and current market fields for an asset.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketDataProvider`).
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve a user-facing ticker (e.g. `"BTC"`) to the provider's asset id.
    ///
    /// Fails with [`ProviderError::UnknownAsset`] when nothing matches.
    fn resolve_asset(&self, symbol: &str) -> BoxFuture<'_, Result<AssetId, Report<ProviderError>>>;

    /// Fetch historical samples. Order and completeness are not guaranteed.
    fn fetch_series(
        &self,
        asset: &AssetId,
        window: HistoryWindow,
    ) -> BoxFuture<'_, Result<Vec<RawSample>, Report<ProviderError>>>;

    /// Fetch the current market snapshot.
    fn fetch_snapshot(
        &self,
        asset: &AssetId,
    ) -> BoxFuture<'_, Result<MarketSnapshot, Report<ProviderError>>>;
}
