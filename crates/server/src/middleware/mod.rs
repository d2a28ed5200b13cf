//! HTTP middleware for the proxy service.

pub mod rate_limiting;

pub use rate_limiting::{rate_limit_middleware, RateLimiter};
