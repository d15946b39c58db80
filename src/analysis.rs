use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt, bail};
use serde::Serialize;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::{AnalysisConfig, LevelsConfig};
use crate::error::AnalysisError;
use crate::indicator::{IndicatorBank, IndicatorSnapshot};
use crate::levels::{PriceRange, SupportResistance, extract_levels, recent_range};
use crate::model::{AssetId, HistoryWindow, MarketSnapshot, RawSample};
use crate::provider::MarketDataProvider;
use crate::series::normalize;
use crate::trend::{TrendGlyphs, render};

/// Immutable engine configuration, shared across requests.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    min_points: usize,
    bank: IndicatorBank,
    levels: LevelsConfig,
    range_window: usize,
    trend_width: usize,
    window: HistoryWindow,
}

impl AnalysisSettings {
    pub fn from_config(
        config: &AnalysisConfig,
        window: HistoryWindow,
    ) -> Result<Self, Report<AnalysisError>> {
        let bank = IndicatorBank::from_config(config).change_context(AnalysisError::InvalidSettings)?;
        Ok(Self {
            min_points: config.min_points.max(1),
            bank,
            levels: config.levels,
            range_window: config.range_window,
            trend_width: config.trend.width,
            window,
        })
    }

    pub fn window(&self) -> HistoryWindow {
        self.window
    }
}

/// Everything the presentation layer needs for one asset, as of the last sample.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub asset: AssetId,
    pub as_of: DateTime<Utc>,
    /// Number of samples in the normalized series.
    pub points: usize,
    pub latest_close: f64,
    pub snapshot: MarketSnapshot,
    pub indicators: IndicatorSnapshot,
    pub levels: SupportResistance,
    pub range: Option<PriceRange>,
    pub trend: TrendGlyphs,
}

/// Run the engine over one fetched series. Pure and synchronous.
pub fn analyze(
    asset: AssetId,
    raw: Vec<RawSample>,
    snapshot: MarketSnapshot,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, Report<AnalysisError>> {
    let series = normalize(raw, settings.min_points)?;
    let Some(latest) = series.latest().copied() else {
        bail!(AnalysisError::InsufficientData {
            required: settings.min_points,
            available: 0,
        });
    };
    let closes = series.closes();

    Ok(AnalysisReport {
        asset,
        as_of: latest.timestamp,
        points: series.len(),
        latest_close: latest.close,
        snapshot,
        indicators: settings.bank.compute(&series),
        levels: extract_levels(&closes, &settings.levels),
        range: recent_range(&closes, settings.range_window),
        trend: render(&closes, settings.trend_width),
    })
}

/// Resolve `symbol`, fetch its data and analyze it.
///
/// Provider failures abort the request; the original [`ProviderError`] stays
/// in the report chain.
///
/// [`ProviderError`]: crate::error::ProviderError
pub async fn run(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, Report<AnalysisError>> {
    let span = info_span!(
        "analysis",
        request_id = %Uuid::new_v4(),
        provider = provider.name(),
        symbol,
    );
    fetch_and_analyze(provider, symbol, settings)
        .instrument(span)
        .await
}

async fn fetch_and_analyze(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, Report<AnalysisError>> {
    let asset = provider
        .resolve_asset(symbol)
        .await
        .change_context(AnalysisError::Provider)?;

    let (raw, snapshot) = futures::try_join!(
        provider.fetch_series(&asset, settings.window),
        provider.fetch_snapshot(&asset),
    )
    .change_context(AnalysisError::Provider)
    .attach_with(|| format!("asset: {asset}"))?;

    info!(asset = %asset, samples = raw.len(), "market data fetched");

    let report = analyze(asset, raw, snapshot, settings)?;

    info!(
        points = report.points,
        as_of = %report.as_of,
        support = report.levels.support.len(),
        resistance = report.levels.resistance.len(),
        trend_width = report.trend.len(),
        "analysis complete"
    );
    Ok(report)
}
