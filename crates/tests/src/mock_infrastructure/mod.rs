//! Mock infrastructure for integration tests.
//!
//! - `UpstreamMock`: a mockito server standing in for every external data source
//! - `ProxyHarness`: the real price proxy bound to an ephemeral port
//! - Helpers that point an [`oracle_core::config::AppConfig`] at the mocks
//!
//! ```ignore
//! use tests::mock_infrastructure::{UpstreamMock, mock_config};
//!
//! let mut upstream = UpstreamMock::new().await;
//! upstream.price("a", "ETH", "3000").await;
//! let config = mock_config(&upstream.url(), &["a"]);
//! ```

pub mod proxy_harness;
pub mod test_helpers;
pub mod upstream_mock;

pub use proxy_harness::ProxyHarness;
pub use test_helpers::*;
pub use upstream_mock::UpstreamMock;
