use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::BTreeMap, time::Duration};

use crate::errors::SourceError;

/// An outbound source request. Every source call is a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), headers: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Raw response handed back by a [`Transport`].
///
/// Status classification and body parsing are left to the caller so that
/// source-specific rules (such as treating a 403 as a zero reading) live
/// next to the source definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to perform an outbound HTTP GET.
///
/// The leader is the only party that holds a transport during a round.
/// Validators never see one.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Timeout`] or [`SourceError::ConnectionFailed`]
    /// when no response was obtained. A response with any status is `Ok`.
    async fn get(&self, request: &HttpRequest, timeout: Duration)
        -> Result<HttpResponse, SourceError>;
}
