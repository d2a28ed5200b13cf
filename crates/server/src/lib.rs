//! Off-chain price proxy.
//!
//! Holds upstream API keys so that contracts using the proxy flavor never
//! see them. Serves `/health`, `/metrics` and `/api/price/:symbol`.

pub mod middleware;
pub mod quotes;
pub mod router;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{middleware::RateLimiter, router::AppState};

/// Builds the service router. Rate limiting covers every route.
pub fn create_app(state: Arc<AppState>, limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/health", get(router::handle_health))
        .route("/metrics", get(router::handle_metrics))
        .route("/api/price/:symbol", get(router::handle_price))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(limiter, middleware::rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
}
