use anyhow::Result;
use axum::serve;
use oracle_core::{config::AppConfig, metrics, source::HttpClient};
use server::{
    create_app,
    middleware::RateLimiter,
    quotes::{QuoteService, UpstreamKeys},
    router::AppState,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,oracle_core={level},server={level},tower_http={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration load failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting price proxy");

    let keys = UpstreamKeys::resolve(&config);
    if keys.coingecko.is_none() && keys.binance.is_none() {
        warn!("No upstream API keys configured; set COINGECKO_API_KEY or BINANCE_API_KEY");
    }
    debug!(?keys, environment = %config.environment, "Configuration loaded");

    let prometheus = match metrics::install_prometheus() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
            None
        }
    };

    let transport = Arc::new(
        HttpClient::with_config(config.http.clone())
            .map_err(|e| anyhow::anyhow!("HTTP client initialization failed: {e}"))?,
    );
    let state = Arc::new(AppState { quotes: QuoteService::new(&config, keys, transport), prometheus });

    let limiter = Arc::new(RateLimiter::from_config(&config.proxy_server));
    let eviction = limiter.spawn_eviction();

    let app = create_app(state, limiter);
    let addr = config.proxy_server.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Price proxy listening");

    if let Err(e) = serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error occurred");
    }

    eviction.abort();
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
