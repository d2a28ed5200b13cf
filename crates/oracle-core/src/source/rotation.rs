//! Credential rotation over a single keyed source.
//!
//! Credentials are stored encoded and decoded only at fetch time. Attempts
//! go round-robin starting from the active index; the first success becomes
//! the new active credential and bumps its success counter.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use tracing::{info, warn};

use super::{FetchParams, Source, SourceSet, Transport};
use crate::{
    errors::{OracleError, SourceError},
    metrics,
    types::Reading,
};

/// Persistent rotation bookkeeping.
///
/// Only [`RotationPolicy`] and the explicit write entry points mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    credentials: Vec<String>,
    active_index: usize,
    success_counts: BTreeMap<usize, u64>,
}

/// Read-only view of rotation bookkeeping. Never carries credential values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStatus {
    pub key_count: usize,
    pub active_index: usize,
    pub success_counts: BTreeMap<usize, u64>,
}

impl RotationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded credential and initializes its success counter.
    ///
    /// Returns the new credential's index.
    ///
    /// # Errors
    ///
    /// [`OracleError::Configuration`] for an empty or whitespace-only value.
    pub fn add_credential(&mut self, encoded: &str) -> Result<usize, OracleError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(OracleError::Configuration("credential cannot be empty".into()));
        }

        self.credentials.push(encoded.to_string());
        let index = self.credentials.len() - 1;
        self.success_counts.insert(index, 0);
        Ok(index)
    }

    /// Advances the active index by one, wrapping around.
    ///
    /// # Errors
    ///
    /// [`OracleError::Configuration`] when no credentials are stored.
    pub fn rotate(&mut self) -> Result<usize, OracleError> {
        if self.credentials.is_empty() {
            return Err(OracleError::Configuration("no credentials available".into()));
        }
        self.active_index = (self.active_index + 1) % self.credentials.len();
        Ok(self.active_index)
    }

    /// Indices in the order a fetch should try them: the active index first,
    /// then the rest circularly. Empty when no credentials are stored.
    #[must_use]
    pub fn try_order(&self) -> Vec<usize> {
        let len = self.credentials.len();
        if len == 0 {
            return Vec::new();
        }
        let start = self.active_index % len;
        (0..len).map(|offset| (start + offset) % len).collect()
    }

    pub(crate) fn record_success(&mut self, index: usize) {
        *self.success_counts.entry(index).or_insert(0) += 1;
        if index != self.active_index {
            self.active_index = index;
        }
    }

    pub(crate) fn credential(&self, index: usize) -> Option<&str> {
        self.credentials.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    #[must_use]
    pub fn success_count(&self, index: usize) -> u64 {
        self.success_counts.get(&index).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn status(&self) -> KeyStatus {
        KeyStatus {
            key_count: self.credentials.len(),
            active_index: self.active_index,
            success_counts: self.success_counts.clone(),
        }
    }
}

/// How stored credentials are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialEncoding {
    Plain,
    #[default]
    Base64,
}

/// A decoded credential. Its `Debug` output is redacted.
pub struct DecodedCredential(String);

impl DecodedCredential {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DecodedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DecodedCredential([redacted])")
    }
}

impl CredentialEncoding {
    /// # Errors
    ///
    /// - [`SourceError::CredentialDecode`] if the value is not valid for the encoding
    /// - [`SourceError::EmptyCredential`] if it decodes to nothing
    pub fn decode(self, encoded: &str) -> Result<DecodedCredential, SourceError> {
        let decoded = match self {
            Self::Plain => encoded.to_string(),
            Self::Base64 => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| SourceError::CredentialDecode("not valid base64".into()))?;
                String::from_utf8(bytes)
                    .map_err(|_| SourceError::CredentialDecode("not valid UTF-8".into()))?
            }
        };

        let decoded = decoded.trim();
        if decoded.is_empty() {
            return Err(SourceError::EmptyCredential);
        }
        Ok(DecodedCredential(decoded.to_string()))
    }

    #[must_use]
    pub fn encode(self, raw: &str) -> String {
        match self {
            Self::Plain => raw.to_string(),
            Self::Base64 => STANDARD.encode(raw),
        }
    }
}

/// Successful rotating fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationOutcome {
    pub reading: Reading,
    /// Index of the credential that succeeded.
    pub index: usize,
}

/// Fetch procedure that attaches each stored credential in turn to one
/// keyed source.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    set: SourceSet,
    source: Source,
    header: String,
    encoding: CredentialEncoding,
}

impl RotationPolicy {
    /// `set` supplies plausibility and timeout; `source` is the keyed endpoint.
    #[must_use]
    pub fn new(set: SourceSet, source: Source, header: impl Into<String>, encoding: CredentialEncoding) -> Self {
        Self { set, source, header: header.into(), encoding }
    }

    #[must_use]
    pub fn encoding(&self) -> CredentialEncoding {
        self.encoding
    }

    /// Tries credentials in [`RotationState::try_order`] and records the winner.
    ///
    /// Reading provenance is `"{source}-key-{index}"`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] when no credentials are stored; no request is made
    /// - [`OracleError::Exhausted`] when every credential failed
    pub async fn fetch_with_rotation(
        &self,
        state: &mut RotationState,
        transport: &dyn Transport,
        params: &FetchParams,
    ) -> Result<RotationOutcome, OracleError> {
        let order = state.try_order();
        if order.is_empty() {
            return Err(OracleError::Configuration("no API keys configured".into()));
        }

        let mut last: Option<(String, SourceError)> = None;

        for index in order.iter().copied() {
            let label = format!("key {index}");

            let attempt = match state.credential(index).map(|raw| self.encoding.decode(raw)) {
                Some(Ok(credential)) => {
                    let headers =
                        BTreeMap::from([(self.header.clone(), credential.expose().to_string())]);
                    self.set.attempt(&self.source, transport, params, &headers).await
                }
                Some(Err(SourceError::CredentialDecode(_))) => {
                    Err(SourceError::CredentialDecode(label.clone()))
                }
                Some(Err(error)) => Err(error),
                None => Err(SourceError::EmptyCredential),
            };

            match attempt {
                Ok(mut reading) => {
                    reading.provenance = format!("{}-key-{index}", self.source.name);
                    state.record_success(index);
                    metrics::record_rotation_success(index);
                    info!(key_index = index, value = reading.value, "rotating fetch succeeded");
                    return Ok(RotationOutcome { reading, index });
                }
                Err(error) => {
                    warn!(key_index = index, error = %error, kind = error.kind(), "credential attempt failed");
                    metrics::record_source_failure(self.set.name(), &label, error.kind());
                    last = Some((label, error));
                }
            }
        }

        let (last_source, last) = last.unwrap_or_else(|| ("key 0".into(), SourceError::EmptyCredential));
        Err(OracleError::Exhausted { attempts: order.len(), last_source, last })
    }
}
