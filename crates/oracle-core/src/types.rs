use serde::{Deserialize, Serialize};
use std::fmt;

/// What a [`Reading`] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    /// USD price of an asset.
    Price,
    /// Degrees Celsius.
    Temperature,
    /// Number of items, such as headlines.
    Count,
}

impl ReadingKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Temperature => "temperature",
            Self::Count => "count",
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric value extracted from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub kind: ReadingKind,
    /// Name of the source that produced the value.
    pub provenance: String,
    /// Secondary text field some sources carry, such as a weather code or an
    /// upstream source label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Price payload. Numeric fields travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReport {
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceField {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherField {
    pub temperature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsField {
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeReport {
    pub symbol: String,
    pub price: PriceField,
    pub weather: WeatherField,
    pub news: NewsField,
}

/// The structured result a leader proposes.
///
/// Serialized with serde_json for validator distribution; the `flavor` tag
/// selects how the committer maps it onto persistent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum RoundResult {
    Price(PriceReport),
    /// Price obtained through a credential-rotating source.
    RotatingKey(PriceReport),
    /// Price obtained from the off-chain proxy service.
    Proxy(PriceReport),
    Composite(CompositeReport),
}

impl RoundResult {
    #[must_use]
    pub fn flavor(&self) -> &'static str {
        match self {
            Self::Price(_) => "price",
            Self::RotatingKey(_) => "rotating_key",
            Self::Proxy(_) => "proxy",
            Self::Composite(_) => "composite",
        }
    }
}

/// Renders an f64 reading the way it travels inside a [`RoundResult`].
#[must_use]
pub fn decimal_string(value: f64) -> String {
    value.to_string()
}
