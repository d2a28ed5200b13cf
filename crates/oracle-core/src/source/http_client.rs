use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::errors::SourceError;

/// Configuration for the outbound HTTP client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent HTTP requests allowed
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds
    pub permit_timeout_ms: u64,
    /// Retries on the same endpoint for transport errors and 5xx responses
    pub max_retries: u32,
    /// Per-call timeout applied to every source request
    pub call_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 64,
            permit_timeout_ms: 500,
            max_retries: 2,
            call_timeout_seconds: 10,
            connect_timeout_seconds: 5,
            user_agent: format!("oracle-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }
}

/// [`Transport`] backed by reqwest with semaphore-based concurrency control.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

/// RAII guard ensuring semaphore permits are always released.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "permit guard dropped"
        );
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, SourceError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Sanitizes network errors so that URLs, and any credential carried in
    /// them, never reach logs or error messages.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_redirect() {
            "redirect refused".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, SourceError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                SourceError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit.max(1))),
            config,
        })
    }

    async fn acquire(&self) -> Result<PermitGuard, SourceError> {
        let permit = tokio::time::timeout(
            Duration::from_millis(self.config.permit_timeout_ms),
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                available_permits = self.concurrent_limit.available_permits(),
                "http client semaphore acquisition timeout"
            );
            SourceError::Timeout
        })?
        .map_err(|_| SourceError::ConnectionFailed("http client shut down".into()))?;

        Ok(PermitGuard::new(permit, Arc::clone(&self.concurrent_limit)))
    }

    async fn send_once(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, SourceError> {
        let mut builder = self.client.get(&request.url).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| Self::classify(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| Self::classify(&e))?;
        Ok(HttpResponse { status, body })
    }

    fn classify(error: &reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::ConnectionFailed(Self::sanitize_network_error(error))
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, SourceError> {
        let _permit = self.acquire().await?;
        let mut retries = 0;

        loop {
            let outcome = self.send_once(request, timeout).await;
            let retryable = match &outcome {
                Ok(response) => response.status >= 500,
                Err(error) => error.is_transient(),
            };

            if retryable && retries < self.config.max_retries {
                retries += 1;
                tracing::debug!(retries, "retrying source request");
                tokio::time::sleep(Duration::from_millis(100 * (1 << retries))).await;
                continue;
            }

            return outcome;
        }
    }
}
