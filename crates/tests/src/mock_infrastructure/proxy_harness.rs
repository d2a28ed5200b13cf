//! The price proxy running in-process on an ephemeral port.

use oracle_core::{
    config::AppConfig,
    source::{HttpClient, HttpClientConfig},
};
use server::{
    create_app,
    middleware::RateLimiter,
    quotes::{QuoteService, UpstreamKeys},
    router::AppState,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::task::JoinHandle;

pub struct ProxyHarness {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ProxyHarness {
    /// Starts the proxy with a Binance key, pointing its Binance upstream at `binance_base`.
    pub async fn start(binance_base: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::default();
        config.proxy_server.binance_base_url = binance_base.to_string();
        let keys = UpstreamKeys { coingecko: None, binance: Some("proxy-held-key".into()) };

        let http = HttpClientConfig { max_retries: 0, ..HttpClientConfig::default() };
        let transport = Arc::new(HttpClient::with_config(http)?);
        let state = Arc::new(AppState {
            quotes: QuoteService::new(&config, keys, transport),
            prometheus: None,
        });
        let app = create_app(state, Arc::new(RateLimiter::new(100, 2)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await;
        });

        Ok(Self { addr, handle })
    }

    /// Base URL a contract stores as its proxy URL.
    #[must_use]
    pub fn proxy_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

impl Drop for ProxyHarness {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
