//! Persistent contract state and its views.
//!
//! Written only by [`StateCommitter`] after quorum acceptance, by the
//! rotation policy for its own bookkeeping, and by the explicit
//! configuration entry points.

pub mod committer;
pub mod store;

pub use committer::{CommitSummary, StateCommitter};
pub use store::{JsonFileStore, MemoryStore, StateStore};

use serde::{Deserialize, Serialize};

use crate::source::{KeyStatus, RotationState};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    pub price: f64,
    pub source: String,
    pub symbol: String,
    pub temperature: f64,
    pub condition: String,
    pub city: String,
    pub news_count: u64,
    pub rotation: RotationState,
    pub proxy_url: String,
}

/// Last committed price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceView {
    pub price: f64,
    pub source: String,
    pub symbol: String,
}

/// Everything a composite round writes plus the configured proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub price: f64,
    pub source: String,
    pub symbol: String,
    pub temperature: f64,
    pub condition: String,
    pub city: String,
    pub news_count: u64,
    pub proxy_url: String,
}

impl PersistentState {
    #[must_use]
    pub fn price_view(&self) -> PriceView {
        PriceView { price: self.price, source: self.source.clone(), symbol: self.symbol.clone() }
    }

    #[must_use]
    pub fn status_view(&self) -> StatusView {
        StatusView {
            price: self.price,
            source: self.source.clone(),
            symbol: self.symbol.clone(),
            temperature: self.temperature,
            condition: self.condition.clone(),
            city: self.city.clone(),
            news_count: self.news_count,
            proxy_url: self.proxy_url.clone(),
        }
    }

    #[must_use]
    pub fn key_status(&self) -> KeyStatus {
        self.rotation.status()
    }
}
