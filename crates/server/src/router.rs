use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use oracle_core::metrics::{self, PrometheusHandle};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::quotes::{QuoteError, QuoteService};

/// Shared state behind every handler.
pub struct AppState {
    pub quotes: QuoteService,
    pub prometheus: Option<PrometheusHandle>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub has_coingecko_key: bool,
    pub has_binance_key: bool,
}

/// Liveness plus which upstream keys are configured. Never reveals the keys.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp_millis(),
        has_coingecko_key: state.quotes.has_coingecko_key(),
        has_binance_key: state.quotes.has_binance_key(),
    })
}

/// `GET /api/price/:symbol`. Upstream failure details stay in the logs.
pub async fn handle_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Response {
    match state.quotes.quote(&symbol).await {
        Ok(quote) => {
            metrics::record_proxy_request(&quote.symbol, "ok");
            Json(quote).into_response()
        }
        Err(QuoteError::InvalidSymbol) => {
            metrics::record_proxy_request("invalid", "invalid_symbol");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid symbol" }))).into_response()
        }
        Err(err @ QuoteError::Unavailable(_)) => {
            metrics::record_proxy_request(&symbol.to_ascii_uppercase(), "unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": err.to_string() })))
                .into_response()
        }
    }
}

/// Prometheus text exposition, or 404 when no recorder is installed.
pub async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
