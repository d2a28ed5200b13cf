//! Keyed upstream price lookups.
//!
//! The proxy holds the API keys; callers only ever see the price and the
//! name of the upstream that produced it.

use oracle_core::{
    config::AppConfig,
    errors::OracleError,
    normalize_symbol,
    source::{Extractor, FetchParams, Plausibility, Source, SourceSet, Transport},
    types::{decimal_string, ReadingKind},
};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

pub const COINGECKO_UPSTREAM: &str = "coingecko-proxy";
pub const BINANCE_UPSTREAM: &str = "binance-proxy";

const COINGECKO_KEY_HEADER: &str = "X-CG-Pro-API-Key";
const BINANCE_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Upstream API keys, from configuration or the process environment.
#[derive(Clone, Default)]
pub struct UpstreamKeys {
    pub coingecko: Option<String>,
    pub binance: Option<String>,
}

impl std::fmt::Debug for UpstreamKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamKeys")
            .field("coingecko", &self.coingecko.as_ref().map(|_| "<redacted>"))
            .field("binance", &self.binance.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl UpstreamKeys {
    /// Config values win; `COINGECKO_API_KEY` and `BINANCE_API_KEY` fill gaps.
    /// Blank keys count as absent.
    #[must_use]
    pub fn resolve(config: &AppConfig) -> Self {
        let pick = |configured: &Option<String>, var: &str| {
            configured
                .clone()
                .or_else(|| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty())
        };

        Self {
            coingecko: pick(&config.proxy_server.coingecko_api_key, "COINGECKO_API_KEY"),
            binance: pick(&config.proxy_server.binance_api_key, "BINANCE_API_KEY"),
        }
    }
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Invalid symbol")]
    InvalidSymbol,

    #[error("All price sources unavailable")]
    Unavailable(#[source] OracleError),
}

/// Response body of a successful price lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub price: String,
    pub source: String,
    pub symbol: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// CoinGecko first, then Binance; an upstream only takes part when its key is set.
pub struct QuoteService {
    transport: Arc<dyn Transport>,
    upstreams: SourceSet,
    coin_ids: BTreeMap<String, String>,
    has_coingecko_key: bool,
    has_binance_key: bool,
}

impl QuoteService {
    #[must_use]
    pub fn new(config: &AppConfig, keys: UpstreamKeys, transport: Arc<dyn Transport>) -> Self {
        let proxy = &config.proxy_server;
        let user_agent = format!("oracle-proxy/{}", env!("CARGO_PKG_VERSION"));
        let has_coingecko_key = keys.coingecko.is_some();
        let has_binance_key = keys.binance.is_some();

        let mut sources = Vec::new();
        if let Some(key) = keys.coingecko {
            sources.push(
                Source::new(
                    COINGECKO_UPSTREAM,
                    format!(
                        "{}/api/v3/simple/price?ids={{coin_id}}&vs_currencies=usd",
                        proxy.coingecko_base_url.trim_end_matches('/')
                    ),
                    Extractor::JsonNumber { pointer: "/{coin_id}/usd".into(), label_pointer: None },
                )
                .with_header(COINGECKO_KEY_HEADER, key)
                .with_header("User-Agent", user_agent.clone()),
            );
        }
        if let Some(key) = keys.binance {
            sources.push(
                Source::new(
                    BINANCE_UPSTREAM,
                    format!(
                        "{}/api/v3/ticker/price?symbol={{symbol}}USDT",
                        proxy.binance_base_url.trim_end_matches('/')
                    ),
                    Extractor::JsonNumber { pointer: "/price".into(), label_pointer: None },
                )
                .with_header(BINANCE_KEY_HEADER, key)
                .with_header("User-Agent", user_agent),
            );
        }

        let upstreams = SourceSet::new(
            "proxy-upstreams",
            ReadingKind::Price,
            sources,
            Plausibility::price(config.validation.price_ceiling),
        )
        .with_call_timeout(config.http.call_timeout());

        Self {
            transport,
            upstreams,
            coin_ids: config.sources.coin_ids.clone(),
            has_coingecko_key,
            has_binance_key,
        }
    }

    #[must_use]
    pub fn has_coingecko_key(&self) -> bool {
        self.has_coingecko_key
    }

    #[must_use]
    pub fn has_binance_key(&self) -> bool {
        self.has_binance_key
    }

    /// Looks up the USD price of `symbol`.
    ///
    /// # Errors
    ///
    /// - [`QuoteError::InvalidSymbol`] for a malformed ticker
    /// - [`QuoteError::Unavailable`] when no keyed upstream produced a price
    pub async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let symbol = normalize_symbol(symbol).map_err(|_| QuoteError::InvalidSymbol)?;
        let lower = symbol.to_ascii_lowercase();
        let coin_id = self.coin_ids.get(&lower).cloned().unwrap_or_else(|| lower.clone());
        let params = FetchParams::new().with("symbol", symbol.clone()).with("coin_id", coin_id);

        match self.upstreams.fetch(self.transport.as_ref(), &params).await {
            Ok(reading) => {
                info!(symbol = %symbol, source = %reading.provenance, "quote served");
                Ok(Quote {
                    price: decimal_string(reading.value),
                    source: reading.provenance,
                    symbol,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                })
            }
            Err(error) => {
                warn!(symbol = %symbol, error = %error, class = error.class(), "no upstream produced a quote");
                Err(QuoteError::Unavailable(error))
            }
        }
    }
}
