use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FetchParams;
use crate::errors::SourceError;

/// How a numeric value is pulled out of a source response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Extractor {
    /// JSON document; the value at `pointer` must be a number or a numeric
    /// string. `label_pointer` optionally names a secondary field carried
    /// along as the reading's label.
    JsonNumber {
        pointer: String,
        #[serde(default)]
        label_pointer: Option<String>,
    },
    /// JSON document; the reading is the length of the array at `pointer`.
    JsonArrayLen { pointer: String },
    /// Text document; the reading is the number of `<tag>` openings, capped
    /// by the integer in the `cap_param` fetch parameter when present.
    TagCount {
        tag: String,
        #[serde(default)]
        cap_param: Option<String>,
    },
}

/// Value produced by an [`Extractor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: f64,
    pub label: Option<String>,
}

impl Extractor {
    /// Extracts the reading from a response body.
    ///
    /// Pointers may contain `{param}` placeholders filled from `params`.
    pub fn extract(&self, body: &[u8], params: &FetchParams) -> Result<Extracted, SourceError> {
        match self {
            Self::JsonNumber { pointer, label_pointer } => {
                let document = parse_json(body)?;
                let pointer = params.render(pointer)?;
                let field = document
                    .pointer(&pointer)
                    .ok_or_else(|| SourceError::MissingField(pointer.clone()))?;
                let value = numeric(field)?;

                let label = match label_pointer {
                    Some(label_pointer) => {
                        let label_pointer = params.render(label_pointer)?;
                        document.pointer(&label_pointer).and_then(label_text)
                    }
                    None => None,
                };

                Ok(Extracted { value, label })
            }
            Self::JsonArrayLen { pointer } => {
                let document = parse_json(body)?;
                let pointer = params.render(pointer)?;
                let items = document
                    .pointer(&pointer)
                    .ok_or_else(|| SourceError::MissingField(pointer.clone()))?
                    .as_array()
                    .ok_or_else(|| SourceError::Malformed(format!("{pointer} is not an array")))?;

                #[allow(clippy::cast_precision_loss)]
                Ok(Extracted { value: items.len() as f64, label: None })
            }
            Self::TagCount { tag, cap_param } => {
                let text = String::from_utf8_lossy(body);
                let needle = format!("<{tag}>");
                let mut count = text.matches(needle.as_str()).count();

                if let Some(cap_param) = cap_param {
                    if let Some(cap) = params.get(cap_param) {
                        let cap: usize = cap.trim().parse().map_err(|_| {
                            SourceError::Template(format!("{cap_param} is not a count"))
                        })?;
                        count = count.min(cap);
                    }
                }

                #[allow(clippy::cast_precision_loss)]
                Ok(Extracted { value: count as f64, label: None })
            }
        }
    }
}

fn parse_json(body: &[u8]) -> Result<Value, SourceError> {
    serde_json::from_slice(body).map_err(|e| SourceError::Malformed(e.to_string()))
}

/// Accepts JSON numbers and numeric strings; rejects non-finite values.
fn numeric(value: &Value) -> Result<f64, SourceError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(SourceError::NotNumeric(truncate(&value.to_string()))),
    }
}

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn truncate(raw: &str) -> String {
    const LIMIT: usize = 64;
    match raw.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}
