use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::{self, AnalysisSettings};
use crate::command;
use crate::config::ServerConfig;
use crate::error::{AnalysisError, CommandError, ProviderError, ServerError};
use crate::provider::MarketDataProvider;
use crate::report;

pub struct AppState {
    pub provider: Arc<dyn MarketDataProvider>,
    pub settings: AnalysisSettings,
}

/// `/analyze` and `/health`, with everything else served from `static_dir`.
pub fn router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `cancel` fires.
pub async fn serve(
    state: Arc<AppState>,
    config: &ServerConfig,
    cancel: CancellationToken,
) -> Result<(), Report<ServerError>> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .change_context(ServerError::Bind {
            addr: config.bind_addr.clone(),
        })?;

    info!(addr = %config.bind_addr, static_dir = %config.static_dir, "listening");

    axum::serve(listener, router(state, &config.static_dir))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .change_context(ServerError::Serve)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    command: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    report: String,
}

/// Accepts a JSON body regardless of the declared content type.
async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request: AnalyzeRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Request body must be JSON."))?;

    let command = command::parse(&request.command).map_err(|report| {
        let message = match report.current_context() {
            CommandError::Empty => "No command provided.",
            CommandError::MissingSymbol => "No asset symbol provided.",
        };
        ApiError::new(StatusCode::BAD_REQUEST, message)
    })?;

    let report = analysis::run(state.provider.as_ref(), &command.symbol, &state.settings)
        .await
        .map_err(ApiError::from_analysis)?;

    Ok(Json(AnalyzeResponse {
        report: report::render(&report, command.mode),
    }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// User-facing failure: a status and a one-line message, never a trace.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn from_analysis(report: Report<AnalysisError>) -> Self {
        warn!(error = ?report, "analysis failed");

        match report.current_context() {
            AnalysisError::InsufficientData { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient data for analysis",
            ),
            AnalysisError::InvalidSettings => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "analysis is misconfigured")
            }
            AnalysisError::Provider => match report.downcast_ref::<ProviderError>() {
                Some(ProviderError::UnknownAsset { symbol }) => Self::new(
                    StatusCode::NOT_FOUND,
                    format!("Asset symbol '{symbol}' not found."),
                ),
                Some(ProviderError::RateLimit { .. }) => Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "market data rate limit reached, try again shortly",
                ),
                _ => Self::new(StatusCode::BAD_GATEWAY, "market data provider unavailable"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::model::{Granularity, HistoryWindow};
    use crate::provider::fake::FakeProvider;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(provider: FakeProvider) -> Router {
        let window = HistoryWindow {
            days: 365,
            granularity: Granularity::Daily,
        };
        let state = Arc::new(AppState {
            provider: Arc::new(provider),
            settings: AnalysisSettings::from_config(&AnalysisConfig::default(), window).unwrap(),
        });
        router(state, "static")
    }

    fn wave_provider() -> FakeProvider {
        let closes: Vec<f64> = (0..120)
            .map(|i| 3_000.0 + (i as f64 * 0.35).sin() * 150.0)
            .collect();
        FakeProvider::with_closes("ETH", &closes)
    }

    async fn post_analyze(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_ok() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(wave_provider()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn analyze_returns_rendered_report() {
        let (status, body) = post_analyze(app(wave_provider()), r#"{"command": "analyze eth"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let report = body["report"].as_str().unwrap();
        assert!(report.contains("ETH Coin (ETH)"));
        assert!(report.contains("Price Chart: "));
    }

    #[tokio::test]
    async fn full_breakdown_mode_is_honored() {
        let (status, body) =
            post_analyze(app(wave_provider()), r#"{"command": "full breakdown eth"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["report"].as_str().unwrap().contains("Bollinger Bands"));
    }

    #[tokio::test]
    async fn empty_command_is_bad_request() {
        let (status, body) = post_analyze(app(wave_provider()), r#"{"command": "  "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No command provided.");

        let (status, _) = post_analyze(app(wave_provider()), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mode_words_without_symbol_are_bad_request() {
        let (status, body) = post_analyze(app(wave_provider()), r#"{"command": "full"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No asset symbol provided.");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, _) = post_analyze(app(wave_provider()), "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_asset_is_not_found() {
        let (status, body) = post_analyze(app(wave_provider()), r#"{"command": "analyze xyz"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Asset symbol 'XYZ' not found.");
        assert!(body.get("report").is_none());
    }

    #[tokio::test]
    async fn short_history_is_unprocessable() {
        let provider = FakeProvider::with_closes("NEW", &[1.0; 5]);
        let (status, body) = post_analyze(app(provider), r#"{"command": "new"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "insufficient data for analysis");
    }

    #[tokio::test]
    async fn provider_rate_limit_is_too_many_requests() {
        let provider = wave_provider().failing_series_with(ProviderError::RateLimit {
            provider: "fake".into(),
        });
        let (status, body) = post_analyze(app(provider), r#"{"command": "eth"}"#).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("rate limit"));
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let provider = wave_provider().failing_series();
        let (status, _) = post_analyze(app(provider), r#"{"command": "eth"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
