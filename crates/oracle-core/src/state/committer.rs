use serde::Serialize;
use tracing::info;

use super::PersistentState;
use crate::{
    errors::CommitError,
    types::{CompositeReport, PriceReport, RoundResult},
};

const UNKNOWN_SOURCE: &str = "unknown";
const PROXY_SOURCE: &str = "proxy";
const UNKNOWN_CONDITION: &str = "Unknown";

/// What a commit wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitSummary {
    pub flavor: &'static str,
    pub price: f64,
    pub source: String,
    pub fields_written: usize,
}

/// Converts an agreed result into persistent state.
///
/// Every field is converted before any is written; the first conversion
/// failure aborts the commit with state untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateCommitter;

struct Staged {
    price: f64,
    source: String,
    symbol: String,
    weather: Option<(f64, String, String)>,
    news_count: Option<u64>,
}

impl StateCommitter {
    /// # Errors
    ///
    /// [`CommitError`] naming the first field that failed to convert.
    pub fn commit(
        &self,
        state: &mut PersistentState,
        result: &RoundResult,
    ) -> Result<CommitSummary, CommitError> {
        let staged = Self::stage(result)?;
        let summary = CommitSummary {
            flavor: result.flavor(),
            price: staged.price,
            source: staged.source.clone(),
            fields_written: 3 +
                staged.weather.as_ref().map_or(0, |_| 3) +
                staged.news_count.map_or(0, |_| 1),
        };

        Self::apply(state, staged);
        info!(
            flavor = summary.flavor,
            price = summary.price,
            source = %summary.source,
            "round committed"
        );
        Ok(summary)
    }

    /// Decodes the agreed payload bytes, then commits.
    ///
    /// # Errors
    ///
    /// [`CommitError`] on field `result` if the payload does not decode.
    pub fn commit_payload(
        &self,
        state: &mut PersistentState,
        payload: &[u8],
    ) -> Result<CommitSummary, CommitError> {
        let result: RoundResult = serde_json::from_slice(payload)
            .map_err(|e| CommitError::new("result", e.to_string()))?;
        self.commit(state, &result)
    }

    fn stage(result: &RoundResult) -> Result<Staged, CommitError> {
        match result {
            RoundResult::Price(report) | RoundResult::RotatingKey(report) => {
                Self::stage_price(report, UNKNOWN_SOURCE)
            }
            RoundResult::Proxy(report) => Self::stage_price(report, PROXY_SOURCE),
            RoundResult::Composite(report) => Self::stage_composite(report),
        }
    }

    fn stage_price(report: &PriceReport, default_source: &str) -> Result<Staged, CommitError> {
        Ok(Staged {
            price: parse_decimal("price", &report.price)?,
            source: report.source.clone().unwrap_or_else(|| default_source.to_string()),
            symbol: report.symbol.clone(),
            weather: None,
            news_count: None,
        })
    }

    fn stage_composite(report: &CompositeReport) -> Result<Staged, CommitError> {
        let price = parse_decimal("price.value", &report.price.value)?;
        let source = report.price.source.clone().unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
        let temperature = parse_decimal("weather.temperature", &report.weather.temperature)?;
        let condition =
            report.weather.condition.clone().unwrap_or_else(|| UNKNOWN_CONDITION.to_string());
        let news_count = u64::try_from(report.news.count)
            .map_err(|_| CommitError::new("news.count", format!("{} is negative", report.news.count)))?;

        Ok(Staged {
            price,
            source,
            symbol: report.symbol.clone(),
            weather: Some((temperature, condition, report.weather.city.clone())),
            news_count: Some(news_count),
        })
    }

    fn apply(state: &mut PersistentState, staged: Staged) {
        state.price = staged.price;
        state.source = staged.source;
        state.symbol = staged.symbol;
        if let Some((temperature, condition, city)) = staged.weather {
            state.temperature = temperature;
            state.condition = condition;
            state.city = city;
        }
        if let Some(news_count) = staged.news_count {
            state.news_count = news_count;
        }
    }
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, CommitError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CommitError::new(field, format!("'{raw}' is not a number")))?;
    if !value.is_finite() {
        return Err(CommitError::new(field, format!("'{raw}' is not finite")));
    }
    Ok(value)
}
