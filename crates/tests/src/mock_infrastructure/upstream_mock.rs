//! mockito-backed upstream for source fetches.
//!
//! Every source in [`super::mock_config`] lives under its own path prefix on
//! a single mock server, so one `UpstreamMock` serves a whole source set.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

pub struct UpstreamMock {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl UpstreamMock {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// `GET /{source}/price/{symbol}` answers `{"price": "<price>"}`.
    pub async fn price(&mut self, source: &str, symbol: &str, price: &str) -> &mut Self {
        self.json(&format!("/{source}/price/{symbol}"), &json!({ "price": price })).await
    }

    /// `GET /{source}/price/{symbol}` answers with a bare status.
    pub async fn price_status(&mut self, source: &str, symbol: &str, status: usize) -> &mut Self {
        self.status(&format!("/{source}/price/{symbol}"), status).await
    }

    /// Keyed price endpoint that only answers for one credential value.
    pub async fn keyed_price(
        &mut self,
        path: &str,
        header: &str,
        key: &str,
        status: usize,
        price: &str,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .match_header(header, key)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "price": price }).to_string())
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    pub async fn json(&mut self, path: &str, body: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    pub async fn text(&mut self, path: &str, body: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    pub async fn status(&mut self, path: &str, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(status)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Mock that fails the test on [`Self::verify`] if it was ever hit.
    pub async fn never(&mut self, path: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .expect(0)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Asserts call-count expectations on every registered mock.
    pub async fn verify(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
