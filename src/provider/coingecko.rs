use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::{AssetId, HistoryWindow, MarketSnapshot, RawSample};
use crate::provider::MarketDataProvider;

const PROVIDER: &str = "coingecko";
const DESCRIPTION_LIMIT: usize = 400;

pub struct CoinGeckoProvider {
    client: reqwest::Client,
    base_url: String,
    vs_currency: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    /// Fetched on first lookup and kept for the process lifetime.
    coin_list: OnceCell<Vec<CoinListEntry>>,
}

impl CoinGeckoProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, Report<ProviderError>> {
        // Free tier allows roughly 30 calls/min
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(nonzero!(25u32));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("coin-analyst/", env!("CARGO_PKG_VERSION")))
            .build()
            .change_context(ProviderError::Request {
                provider: PROVIDER.into(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            vs_currency: config.vs_currency.to_lowercase(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            coin_list: OnceCell::new(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Report<ProviderError>> {
        // Wait for rate limiter before making the request
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "coingecko request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .change_context(ProviderError::Request {
                provider: PROVIDER.into(),
            })
            .attach_with(|| format!("url: {url}"))?;

        check_status(response.status()).attach_with(|| format!("url: {url}"))?;

        response
            .json()
            .await
            .change_context(ProviderError::ResponseParse {
                provider: PROVIDER.into(),
            })
            .attach_with(|| format!("url: {url}"))
    }

    async fn coin_list(&self) -> Result<&[CoinListEntry], Report<ProviderError>> {
        let list = self
            .coin_list
            .get_or_try_init(|| async {
                let list: Vec<CoinListEntry> = self.get_json("/coins/list", &[]).await?;
                info!(coins = list.len(), "coingecko coin list loaded");
                Ok::<_, Report<ProviderError>>(list)
            })
            .await?;
        Ok(list)
    }
}

impl MarketDataProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn resolve_asset(&self, symbol: &str) -> BoxFuture<'_, Result<AssetId, Report<ProviderError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let list = self.coin_list().await?;
            find_coin(list, &symbol)
                .map(|entry| AssetId {
                    id: entry.id.clone(),
                    symbol: entry.symbol.to_uppercase(),
                    name: entry.name.clone(),
                })
                .ok_or_else(|| Report::new(ProviderError::UnknownAsset { symbol }))
        })
    }

    fn fetch_series(
        &self,
        asset: &AssetId,
        window: HistoryWindow,
    ) -> BoxFuture<'_, Result<Vec<RawSample>, Report<ProviderError>>> {
        let asset = asset.clone();
        Box::pin(async move {
            let mut params = vec![
                ("vs_currency", self.vs_currency.clone()),
                ("days", window.days.to_string()),
            ];
            if let Some(interval) = window.granularity.coingecko_interval() {
                params.push(("interval", interval.to_owned()));
            }

            let chart: MarketChart = self
                .get_json(&format!("/coins/{}/market_chart", asset.id), &params)
                .await?;
            let samples = chart.into_samples();

            info!(
                asset = %asset,
                days = window.days,
                granularity = %window.granularity,
                fetched = samples.len(),
                "coingecko series fetch complete"
            );
            Ok(samples)
        })
    }

    fn fetch_snapshot(
        &self,
        asset: &AssetId,
    ) -> BoxFuture<'_, Result<MarketSnapshot, Report<ProviderError>>> {
        let asset = asset.clone();
        Box::pin(async move {
            let params = [
                ("localization", "false".to_owned()),
                ("tickers", "false".to_owned()),
                ("market_data", "true".to_owned()),
                ("community_data", "false".to_owned()),
                ("developer_data", "false".to_owned()),
                ("sparkline", "false".to_owned()),
            ];
            let detail: CoinDetail = self
                .get_json(&format!("/coins/{}", asset.id), &params)
                .await?;
            detail.into_snapshot(&self.vs_currency)
        })
    }
}

/// 429 is a rate limit; any other non-2xx status is a failed request.
fn check_status(status: StatusCode) -> Result<(), Report<ProviderError>> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Report::new(ProviderError::RateLimit {
            provider: PROVIDER.into(),
        })
        .attach(format!("HTTP status: {status}")));
    }
    if !status.is_success() {
        return Err(Report::new(ProviderError::Request {
            provider: PROVIDER.into(),
        })
        .attach(format!("HTTP status: {status}")));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
struct CoinListEntry {
    id: String,
    symbol: String,
    name: String,
}

/// An exact id match (`"bitcoin"`) wins over the first ticker match (`"btc"`).
fn find_coin<'a>(list: &'a [CoinListEntry], query: &str) -> Option<&'a CoinListEntry> {
    let query = query.trim().to_lowercase();
    list.iter()
        .find(|c| c.id == query)
        .or_else(|| list.iter().find(|c| c.symbol.eq_ignore_ascii_case(&query)))
}

/// `/coins/{id}/market_chart` body: parallel arrays of `[unix_ms, value]`.
#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    total_volumes: Vec<(f64, Option<f64>)>,
}

impl MarketChart {
    fn into_samples(self) -> Vec<RawSample> {
        let volumes: HashMap<i64, f64> = self
            .total_volumes
            .into_iter()
            .filter_map(|(ts, v)| v.map(|v| (ts as i64, v)))
            .collect();

        self.prices
            .into_iter()
            .filter_map(|(ts, price)| {
                let ms = ts as i64;
                let timestamp = DateTime::from_timestamp_millis(ms)?;
                Some(RawSample {
                    timestamp,
                    open: None,
                    high: None,
                    low: None,
                    close: price,
                    volume: volumes.get(&ms).copied(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CoinDetail {
    name: String,
    symbol: String,
    #[serde(default)]
    description: Description,
    market_data: CoinMarketData,
}

#[derive(Debug, Default, Deserialize)]
struct Description {
    #[serde(default)]
    en: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: HashMap<String, Option<f64>>,
    #[serde(default)]
    market_cap: HashMap<String, Option<f64>>,
    #[serde(default)]
    total_volume: HashMap<String, Option<f64>>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
}

impl CoinDetail {
    fn into_snapshot(self, vs_currency: &str) -> Result<MarketSnapshot, Report<ProviderError>> {
        let quote = |map: &HashMap<String, Option<f64>>| map.get(vs_currency).copied().flatten();

        let price = quote(&self.market_data.current_price).ok_or_else(|| {
            Report::new(ProviderError::ResponseParse {
                provider: PROVIDER.into(),
            })
            .attach(format!("no current price in {vs_currency}"))
        })?;

        Ok(MarketSnapshot {
            name: self.name,
            symbol: self.symbol.to_uppercase(),
            price,
            market_cap: quote(&self.market_data.market_cap).unwrap_or(0.0),
            volume_24h: quote(&self.market_data.total_volume).unwrap_or(0.0),
            circulating_supply: self.market_data.circulating_supply,
            total_supply: self.market_data.total_supply,
            utility_description: summarize(self.description.en.as_deref().unwrap_or_default()),
        })
    }
}

fn summarize(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(DESCRIPTION_LIMIT)
        .collect()
}
