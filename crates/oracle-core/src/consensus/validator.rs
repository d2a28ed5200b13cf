//! Validator predicates.
//!
//! A validator sees only the serialized leader result. It performs no I/O
//! and reads no clock, so every honest validator reaches the same verdict on
//! the same bytes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Pure accept/reject decision over a serialized leader result.
pub trait ValidatorPredicate: Send + Sync {
    /// Returns `true` to accept. Malformed input is a rejection, never a panic
    /// the caller has to care about.
    fn accept(&self, payload: &[u8]) -> bool;
}

/// Range checks shared by the validators and the leader's price plausibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationBounds {
    /// Prices must be strictly above this (default: 0)
    #[serde(default)]
    pub price_floor: f64,
    /// Prices must be strictly below this (default: 100000)
    #[serde(default = "default_price_ceiling")]
    pub price_ceiling: f64,
}

fn default_price_ceiling() -> f64 {
    100_000.0
}

impl Default for ValidationBounds {
    fn default() -> Self {
        Self { price_floor: 0.0, price_ceiling: default_price_ceiling() }
    }
}

impl ValidationBounds {
    fn price_in_range(&self, price: f64) -> bool {
        price > self.price_floor && price < self.price_ceiling
    }

    /// # Errors
    ///
    /// Returns a description of the invalid bound.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.price_floor.is_finite() && self.price_ceiling.is_finite()) {
            return Err("validation bounds must be finite".into());
        }
        if self.price_floor >= self.price_ceiling {
            return Err(format!(
                "validation.price_floor ({}) must be below price_ceiling ({})",
                self.price_floor, self.price_ceiling
            ));
        }
        Ok(())
    }
}

/// Accepts `{"price": <numeric>, "source"?: <string>}` with the price in range.
#[derive(Debug, Clone, Default)]
pub struct PriceValidator {
    bounds: ValidationBounds,
}

impl PriceValidator {
    #[must_use]
    pub fn new(bounds: ValidationBounds) -> Self {
        Self { bounds }
    }

    fn check(&self, payload: &[u8]) -> Result<(), &'static str> {
        let document = parse_object(payload)?;
        let price = document.get("price").ok_or("missing price")?;
        let price = numeric(price).ok_or("price is not numeric")?;
        if !self.bounds.price_in_range(price) {
            return Err("price out of range");
        }
        optional_string(&document, "source")?;
        Ok(())
    }
}

impl ValidatorPredicate for PriceValidator {
    fn accept(&self, payload: &[u8]) -> bool {
        verdict("price", self.check(payload))
    }
}

/// Accepts the nested price/weather/news document.
#[derive(Debug, Clone, Default)]
pub struct CompositeValidator {
    bounds: ValidationBounds,
}

impl CompositeValidator {
    #[must_use]
    pub fn new(bounds: ValidationBounds) -> Self {
        Self { bounds }
    }

    fn check(&self, payload: &[u8]) -> Result<(), &'static str> {
        let document = parse_object(payload)?;

        let price = object(&document, "price")?;
        let value = price.get("value").ok_or("missing price.value")?;
        let value = numeric(value).ok_or("price.value is not numeric")?;
        if !self.bounds.price_in_range(value) {
            return Err("price.value out of range");
        }
        optional_string(price, "source")?;

        let weather = object(&document, "weather")?;
        let temperature = weather.get("temperature").ok_or("missing weather.temperature")?;
        numeric(temperature).ok_or("weather.temperature is not numeric")?;
        optional_string(weather, "condition")?;
        optional_string(weather, "city")?;

        let news = object(&document, "news")?;
        let count = news.get("count").ok_or("missing news.count")?;
        let count = integer(count).ok_or("news.count is not an integer")?;
        if count < 0 {
            return Err("news.count is negative");
        }

        Ok(())
    }
}

impl ValidatorPredicate for CompositeValidator {
    fn accept(&self, payload: &[u8]) -> bool {
        verdict("composite", self.check(payload))
    }
}

fn verdict(validator: &'static str, outcome: Result<(), &'static str>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(reason) => {
            debug!(validator, reason, "validator rejected result");
            false
        }
    }
}

fn parse_object(payload: &[u8]) -> Result<Map<String, Value>, &'static str> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("payload is not an object"),
        Err(_) => Err("payload is not JSON"),
    }
}

fn object<'a>(document: &'a Map<String, Value>, key: &'static str) -> Result<&'a Map<String, Value>, &'static str> {
    match document.get(key) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err("section is not an object"),
        None => Err("missing section"),
    }
}

fn optional_string(document: &Map<String, Value>, key: &str) -> Result<(), &'static str> {
    match document.get(key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err("label field is not a string"),
    }
}

/// Numbers may arrive as JSON numbers or decimal strings.
fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
