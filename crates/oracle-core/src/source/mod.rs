//! External data sources and ordered fallback.
//!
//! A [`Source`] is an endpoint template plus an [`Extractor`]. A [`SourceSet`]
//! tries its sources in order and returns the first plausible [`Reading`].
//! Credential rotation over a single keyed source lives in [`rotation`].

pub mod defaults;
pub mod extractor;
pub mod http_client;
pub mod rotation;
pub mod transport;

pub use extractor::{Extracted, Extractor};
pub use http_client::{HttpClient, HttpClientConfig};
pub use rotation::{CredentialEncoding, KeyStatus, RotationOutcome, RotationPolicy, RotationState};
pub use transport::{HttpRequest, HttpResponse, Transport};

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    errors::{OracleError, SourceError},
    metrics,
    types::{Reading, ReadingKind},
};

/// Named values substituted into endpoint templates and JSON pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams(BTreeMap<String, String>);

impl FetchParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Replaces every `{name}` in `template` with its parameter value.
    ///
    /// # Errors
    ///
    /// [`SourceError::Template`] for an unknown name or an unclosed brace.
    pub fn render(&self, template: &str) -> Result<String, SourceError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| SourceError::Template(format!("unclosed placeholder in {template}")))?;
            let name = &after[..close];
            let value = self
                .get(name)
                .ok_or_else(|| SourceError::Template(format!("unknown placeholder {{{name}}}")))?;
            out.push_str(value);
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// One external endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Identifier recorded as the reading's provenance.
    pub name: String,
    pub endpoint_template: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub extractor: Extractor,
    /// Statuses that count as a successful zero reading rather than a failure.
    #[serde(default)]
    pub zero_on_status: Vec<u16>,
}

impl Source {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        endpoint_template: impl Into<String>,
        extractor: Extractor,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint_template: endpoint_template.into(),
            headers: BTreeMap::new(),
            extractor,
            zero_on_status: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_zero_on_status(mut self, status: u16) -> Self {
        self.zero_on_status.push(status);
        self
    }
}

/// Open or closed range a reading must fall in to be accepted from a source.
///
/// The ceiling, when set, is always exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plausibility {
    pub floor: f64,
    #[serde(default)]
    pub floor_inclusive: bool,
    #[serde(default)]
    pub ceiling: Option<f64>,
}

impl Plausibility {
    /// Strictly positive and below `ceiling`.
    #[must_use]
    pub fn price(ceiling: f64) -> Self {
        Self { floor: 0.0, floor_inclusive: false, ceiling: Some(ceiling) }
    }

    /// Zero or more.
    #[must_use]
    pub fn count() -> Self {
        Self { floor: 0.0, floor_inclusive: true, ceiling: None }
    }

    /// Surface air temperature in Celsius.
    #[must_use]
    pub fn temperature() -> Self {
        Self { floor: -100.0, floor_inclusive: false, ceiling: Some(100.0) }
    }

    /// # Errors
    ///
    /// [`SourceError::Implausible`] when `value` is outside the range.
    pub fn check(&self, value: f64) -> Result<(), SourceError> {
        let above_floor =
            if self.floor_inclusive { value >= self.floor } else { value > self.floor };
        let below_ceiling = self.ceiling.map_or(true, |ceiling| value < ceiling);

        if value.is_finite() && above_floor && below_ceiling {
            Ok(())
        } else {
            Err(SourceError::Implausible(value))
        }
    }
}

/// Ordered list of interchangeable sources for one kind of reading.
#[derive(Debug, Clone)]
pub struct SourceSet {
    name: String,
    kind: ReadingKind,
    sources: Vec<Source>,
    plausibility: Plausibility,
    call_timeout: Duration,
}

impl SourceSet {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ReadingKind,
        sources: Vec<Source>,
        plausibility: Plausibility,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            sources,
            plausibility,
            call_timeout: HttpClientConfig::default().call_timeout(),
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Returns the first plausible reading, trying sources in order.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] if the set has no sources
    /// - [`OracleError::Exhausted`] if every source failed, carrying the last error
    pub async fn fetch(
        &self,
        transport: &dyn Transport,
        params: &FetchParams,
    ) -> Result<Reading, OracleError> {
        if self.sources.is_empty() {
            return Err(OracleError::Configuration(format!(
                "source set '{}' has no sources",
                self.name
            )));
        }

        let no_extra_headers = BTreeMap::new();
        let mut last: Option<(String, SourceError)> = None;

        for source in &self.sources {
            debug!(set = %self.name, source = %source.name, "fetching from source");

            match self.attempt(source, transport, params, &no_extra_headers).await {
                Ok(reading) => {
                    info!(
                        set = %self.name,
                        source = %source.name,
                        value = reading.value,
                        "source reading accepted"
                    );
                    return Ok(reading);
                }
                Err(error) => {
                    warn!(
                        set = %self.name,
                        source = %source.name,
                        error = %error,
                        kind = error.kind(),
                        "source failed, trying next"
                    );
                    metrics::record_source_failure(&self.name, &source.name, error.kind());
                    last = Some((source.name.clone(), error));
                }
            }
        }

        let (last_source, last) =
            last.unwrap_or_else(|| (self.name.clone(), SourceError::EmptyBody));
        Err(OracleError::Exhausted { attempts: self.sources.len(), last_source, last })
    }

    /// Performs a single attempt against one source.
    ///
    /// `extra_headers` are merged over the source's own headers; the rotation
    /// policy uses them to attach a decoded credential.
    pub(crate) async fn attempt(
        &self,
        source: &Source,
        transport: &dyn Transport,
        params: &FetchParams,
        extra_headers: &BTreeMap<String, String>,
    ) -> Result<Reading, SourceError> {
        let url = params.render(&source.endpoint_template)?;
        let mut request = HttpRequest::get(url);
        request.headers.extend(source.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        request.headers.extend(extra_headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let response = tokio::time::timeout(self.call_timeout, transport.get(&request, self.call_timeout))
            .await
            .map_err(|_| SourceError::Timeout)??;

        if source.zero_on_status.contains(&response.status) {
            debug!(source = %source.name, status = response.status, "status mapped to zero reading");
            return Ok(self.reading(0.0, source, None));
        }
        if !response.is_success() {
            return Err(SourceError::HttpStatus(response.status));
        }
        if response.body.is_empty() {
            return Err(SourceError::EmptyBody);
        }

        let extracted = source.extractor.extract(&response.body, params)?;
        self.plausibility.check(extracted.value)?;
        Ok(self.reading(extracted.value, source, extracted.label))
    }

    fn reading(&self, value: f64, source: &Source, label: Option<String>) -> Reading {
        Reading { value, kind: self.kind, provenance: source.name.clone(), label }
    }
}
