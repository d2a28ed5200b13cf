//! The oracle contract surface.
//!
//! [`OracleContract`] owns persistent state and exposes the write entry
//! points (each of which may run one consensus round) and read-only views.

mod procedures;

pub use procedures::CompositeRequest;

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};
use tracing::info;

use self::procedures::{CompositeProcedure, PriceFeedProcedure, ProxyProcedure, RotatingKeyProcedure};
use crate::{
    config::AppConfig,
    consensus::{
        CompositeValidator, ConsensusRunner, LeaderProcedure, PriceValidator, RoundReport,
        ValidationBounds, ValidatorPredicate,
    },
    errors::OracleError,
    source::{
        Extractor, FetchParams, HttpClient, KeyStatus, Plausibility, RotationPolicy, Source,
        SourceSet, Transport,
    },
    state::{PersistentState, PriceView, StatusView},
    types::ReadingKind,
};

/// Which leader procedure a price update runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFlavor {
    /// Ordered public sources.
    PriceFeed,
    /// Keyed source with credential rotation.
    RotatingKey,
    /// Off-chain proxy service.
    Proxy,
}

impl fmt::Display for PriceFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PriceFeed => "price-feed",
            Self::RotatingKey => "rotating-key",
            Self::Proxy => "proxy",
        })
    }
}

impl FromStr for PriceFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "price-feed" | "price" => Ok(Self::PriceFeed),
            "rotating-key" | "rotating" => Ok(Self::RotatingKey),
            "proxy" => Ok(Self::Proxy),
            other => Err(format!("unknown price flavor: {other}")),
        }
    }
}

/// Source sets resolved from configuration, shared by all procedures.
#[derive(Debug)]
pub struct SourceCatalog {
    pub price: SourceSet,
    pub weather: SourceSet,
    pub news: SourceSet,
    pub proxy: SourceSet,
    pub rotation: RotationPolicy,
    coin_ids: BTreeMap<String, String>,
}

impl SourceCatalog {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = config.http.call_timeout();
        let price_range = Plausibility {
            floor: config.validation.price_floor,
            floor_inclusive: false,
            ceiling: Some(config.validation.price_ceiling),
        };
        let sources = &config.sources;

        let proxy_source = Source::new(
            "proxy",
            format!("{{proxy_url}}{}", sources.proxy_path),
            Extractor::JsonNumber { pointer: "/price".into(), label_pointer: Some("/source".into()) },
        );

        let rotation_set =
            SourceSet::new("price", ReadingKind::Price, vec![], price_range).with_call_timeout(timeout);

        Self {
            price: SourceSet::new("price", ReadingKind::Price, sources.price.clone(), price_range)
                .with_call_timeout(timeout),
            weather: SourceSet::new(
                "weather",
                ReadingKind::Temperature,
                sources.weather.clone(),
                Plausibility::temperature(),
            )
            .with_call_timeout(timeout),
            news: SourceSet::new("news", ReadingKind::Count, sources.news.clone(), Plausibility::count())
                .with_call_timeout(timeout),
            proxy: SourceSet::new("proxy", ReadingKind::Price, vec![proxy_source], price_range)
                .with_call_timeout(timeout),
            rotation: RotationPolicy::new(
                rotation_set,
                sources.rotation.source.clone(),
                sources.rotation.header.clone(),
                sources.rotation.encoding,
            ),
            coin_ids: sources.coin_ids.clone(),
        }
    }

    /// `symbol`, `symbol_lower` and `coin_id` parameters for a ticker.
    #[must_use]
    pub fn symbol_params(&self, symbol: &str) -> FetchParams {
        let lower = symbol.to_ascii_lowercase();
        let coin_id = self.coin_ids.get(&lower).cloned().unwrap_or_else(|| lower.clone());
        FetchParams::new().with("symbol", symbol).with("symbol_lower", lower).with("coin_id", coin_id)
    }
}

pub struct OracleContract {
    state: PersistentState,
    catalog: Arc<SourceCatalog>,
    runner: ConsensusRunner,
    transport: Arc<dyn Transport>,
    bounds: ValidationBounds,
    validators: usize,
}

impl OracleContract {
    /// # Errors
    ///
    /// [`OracleError::Configuration`] if `config` does not validate.
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        state: PersistentState,
    ) -> Result<Self, OracleError> {
        config.validate().map_err(OracleError::Configuration)?;

        Ok(Self {
            state,
            catalog: Arc::new(SourceCatalog::from_config(config)),
            runner: ConsensusRunner::new(config.consensus.clone()),
            transport,
            bounds: config.validation,
            validators: config.consensus.validators,
        })
    }

    /// Builds a contract that fetches over real HTTP.
    ///
    /// # Errors
    ///
    /// [`OracleError::Configuration`] if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn with_http(config: &AppConfig, state: PersistentState) -> Result<Self, OracleError> {
        let client = HttpClient::with_config(config.http.clone())
            .map_err(|e| OracleError::Configuration(e.to_string()))?;
        Self::new(config, Arc::new(client), state)
    }

    #[must_use]
    pub fn state(&self) -> &PersistentState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> PersistentState {
        self.state
    }

    /// Stores an encoded API credential for the rotating-key flavor.
    ///
    /// # Errors
    ///
    /// [`OracleError::Configuration`] for an empty value.
    pub fn add_credential(&mut self, encoded: &str) -> Result<usize, OracleError> {
        let index = self.state.rotation.add_credential(encoded)?;
        info!(key_index = index, key_count = self.state.rotation.len(), "credential added");
        Ok(index)
    }

    /// Manually advances the active credential.
    ///
    /// # Errors
    ///
    /// [`OracleError::Configuration`] when no credentials are stored.
    pub fn rotate(&mut self) -> Result<usize, OracleError> {
        let index = self.state.rotation.rotate()?;
        info!(active_index = index, "credential rotated");
        Ok(index)
    }

    /// # Errors
    ///
    /// [`OracleError::Configuration`] unless the URL is http(s).
    pub fn set_proxy_url(&mut self, url: &str) -> Result<(), OracleError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(OracleError::Configuration(format!("proxy URL must be http(s): {url}")));
        }
        self.state.proxy_url = url.trim_end_matches('/').to_string();
        info!(proxy_url = %self.state.proxy_url, "proxy URL set");
        Ok(())
    }

    /// Runs one price round with the chosen flavor.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] for a bad symbol, no credentials
    ///   (rotating-key), or no proxy URL (proxy); no request is made
    /// - Any round failure from [`ConsensusRunner::run_round`]
    pub async fn update_price(
        &mut self,
        flavor: PriceFlavor,
        symbol: &str,
    ) -> Result<RoundReport, OracleError> {
        let symbol = normalize_symbol(symbol)?;
        let catalog = Arc::clone(&self.catalog);

        let procedure: Box<dyn LeaderProcedure> = match flavor {
            PriceFlavor::PriceFeed => Box::new(PriceFeedProcedure { catalog, symbol }),
            PriceFlavor::RotatingKey => {
                if self.state.rotation.is_empty() {
                    return Err(OracleError::Configuration("no API keys configured".into()));
                }
                Box::new(RotatingKeyProcedure { catalog, symbol })
            }
            PriceFlavor::Proxy => {
                if self.state.proxy_url.is_empty() {
                    return Err(OracleError::Configuration("proxy URL is not set".into()));
                }
                Box::new(ProxyProcedure { catalog, symbol })
            }
        };

        let validators = self.price_validators();
        self.runner
            .run_round(procedure.as_ref(), &validators, self.transport.as_ref(), &mut self.state)
            .await
    }

    /// Runs one composite round: price, weather and headline count.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] for an empty city or out-of-range coordinates
    /// - Any round failure from [`ConsensusRunner::run_round`]
    pub async fn update_all(&mut self, request: CompositeRequest) -> Result<RoundReport, OracleError> {
        let request = validate_composite(request)?;
        let procedure = CompositeProcedure {
            catalog: Arc::clone(&self.catalog),
            symbol: "ETH".to_string(),
            request,
        };

        let validator: Arc<dyn ValidatorPredicate> = Arc::new(CompositeValidator::new(self.bounds));
        let validators = vec![validator; self.validators];
        self.runner
            .run_round(&procedure, &validators, self.transport.as_ref(), &mut self.state)
            .await
    }

    #[must_use]
    pub fn price(&self) -> PriceView {
        self.state.price_view()
    }

    #[must_use]
    pub fn status(&self) -> StatusView {
        self.state.status_view()
    }

    #[must_use]
    pub fn key_status(&self) -> KeyStatus {
        self.state.key_status()
    }

    fn price_validators(&self) -> Vec<Arc<dyn ValidatorPredicate>> {
        let validator: Arc<dyn ValidatorPredicate> = Arc::new(PriceValidator::new(self.bounds));
        vec![validator; self.validators]
    }
}

/// Trims and uppercases a ticker of 1 to 10 ASCII alphanumerics.
///
/// # Errors
///
/// [`OracleError::Configuration`] for anything else.
pub fn normalize_symbol(symbol: &str) -> Result<String, OracleError> {
    let symbol = symbol.trim();
    if symbol.is_empty() || symbol.len() > 10 || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(OracleError::Configuration(format!("invalid symbol: {symbol:?}")));
    }
    Ok(symbol.to_ascii_uppercase())
}

fn validate_composite(request: CompositeRequest) -> Result<CompositeRequest, OracleError> {
    let city = request.city.trim().to_string();
    if city.is_empty() {
        return Err(OracleError::Configuration("city must not be empty".into()));
    }
    let latitude = coordinate("latitude", &request.latitude, 90.0)?;
    let longitude = coordinate("longitude", &request.longitude, 180.0)?;
    Ok(CompositeRequest { city, latitude, longitude, news_limit: request.news_limit })
}

fn coordinate(name: &str, raw: &str, limit: f64) -> Result<String, OracleError> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && (-limit..=limit).contains(&value) => Ok(raw.to_string()),
        _ => Err(OracleError::Configuration(format!("{name} must be within ±{limit}: {raw:?}"))),
    }
}
