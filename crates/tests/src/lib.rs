//! Integration tests for the oracle engine, contract surface and price proxy.
//!
//! - `fallback_tests`: ordered source fallback through real HTTP
//! - `rotation_tests`: API key rotation order and bookkeeping
//! - `round_tests`: idempotence, persistence and failure atomicity
//! - `proxy_flavor_tests`: contract rounds through the in-process proxy
//! - `composite_tests`: the price, weather and headline round
//! - `mock_infrastructure`: reusable mock upstream and proxy harness
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No external network access is needed; every upstream is a local mock.

#[cfg(test)]
mod fallback_tests;

#[cfg(test)]
mod rotation_tests;

#[cfg(test)]
mod round_tests;

#[cfg(test)]
mod proxy_flavor_tests;

#[cfg(test)]
mod composite_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
