//! Leader procedures for each contract flavor.

use async_trait::async_trait;
use std::sync::Arc;

use super::SourceCatalog;
use crate::{
    consensus::{LeaderContext, LeaderProcedure},
    errors::OracleError,
    types::{
        decimal_string, CompositeReport, NewsField, PriceField, PriceReport, RoundResult,
        WeatherField,
    },
};

/// First plausible price from the ordered public sources.
pub(crate) struct PriceFeedProcedure {
    pub catalog: Arc<SourceCatalog>,
    pub symbol: String,
}

#[async_trait]
impl LeaderProcedure for PriceFeedProcedure {
    fn flavor(&self) -> &'static str {
        "price"
    }

    async fn propose(&self, ctx: &mut LeaderContext<'_>) -> Result<RoundResult, OracleError> {
        let params = self.catalog.symbol_params(&self.symbol);
        let reading = ctx.critical(&self.catalog.price, &params).await?;

        Ok(RoundResult::Price(PriceReport {
            price: decimal_string(reading.value),
            source: Some(reading.provenance),
            symbol: self.symbol.clone(),
        }))
    }
}

/// Price from the keyed source, rotating through stored credentials.
pub(crate) struct RotatingKeyProcedure {
    pub catalog: Arc<SourceCatalog>,
    pub symbol: String,
}

#[async_trait]
impl LeaderProcedure for RotatingKeyProcedure {
    fn flavor(&self) -> &'static str {
        "rotating_key"
    }

    async fn propose(&self, ctx: &mut LeaderContext<'_>) -> Result<RoundResult, OracleError> {
        let params = self.catalog.symbol_params(&self.symbol);
        let outcome = ctx.rotating(&self.catalog.rotation, &params).await?;

        Ok(RoundResult::RotatingKey(PriceReport {
            price: decimal_string(outcome.reading.value),
            source: Some(outcome.reading.provenance),
            symbol: self.symbol.clone(),
        }))
    }
}

/// Price from the configured off-chain proxy.
pub(crate) struct ProxyProcedure {
    pub catalog: Arc<SourceCatalog>,
    pub symbol: String,
}

#[async_trait]
impl LeaderProcedure for ProxyProcedure {
    fn flavor(&self) -> &'static str {
        "proxy"
    }

    async fn propose(&self, ctx: &mut LeaderContext<'_>) -> Result<RoundResult, OracleError> {
        let proxy_url = ctx.snapshot().proxy_url.clone();
        if proxy_url.is_empty() {
            return Err(OracleError::Configuration("proxy URL is not set".into()));
        }

        let params = self.catalog.symbol_params(&self.symbol).with("proxy_url", proxy_url);
        let reading = ctx.critical(&self.catalog.proxy, &params).await?;

        // The proxy reports which upstream it used; absent that, the committer
        // records the generic proxy label.
        Ok(RoundResult::Proxy(PriceReport {
            price: decimal_string(reading.value),
            source: reading.label,
            symbol: self.symbol.clone(),
        }))
    }
}

/// Arguments to the composite update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeRequest {
    pub city: String,
    pub latitude: String,
    pub longitude: String,
    pub news_limit: u32,
}

/// Price and weather are critical; headlines are best effort.
pub(crate) struct CompositeProcedure {
    pub catalog: Arc<SourceCatalog>,
    pub symbol: String,
    pub request: CompositeRequest,
}

#[async_trait]
impl LeaderProcedure for CompositeProcedure {
    fn flavor(&self) -> &'static str {
        "composite"
    }

    async fn propose(&self, ctx: &mut LeaderContext<'_>) -> Result<RoundResult, OracleError> {
        let params = self
            .catalog
            .symbol_params(&self.symbol)
            .with("lat", self.request.latitude.clone())
            .with("lon", self.request.longitude.clone())
            .with("city", self.request.city.clone())
            .with("limit", self.request.news_limit.to_string());

        let price = ctx.critical(&self.catalog.price, &params).await?;
        let weather = ctx.critical(&self.catalog.weather, &params).await?;

        // No headlines is a valid reading; zero stands in when every news source fails.
        #[allow(clippy::cast_possible_truncation)]
        let news_count = ctx.best_effort(&self.catalog.news, &params).await?.map_or(0, |r| r.value as i64);

        Ok(RoundResult::Composite(CompositeReport {
            symbol: self.symbol.clone(),
            price: PriceField { value: decimal_string(price.value), source: Some(price.provenance) },
            weather: WeatherField {
                temperature: decimal_string(weather.value),
                condition: weather.label,
                city: self.request.city.clone(),
            },
            news: NewsField { count: news_count },
        }))
    }
}
