//! Cross-cutting request middleware.
//!
//! This module provides:
//! - Request logging with latency tracking
//! - Rate limiting per IP address
//! - Security response headers
//! - Query de-duplication and JSON body sanitization

pub mod logging;
pub mod rate_limit;
pub mod sanitize;
pub mod security;

pub use logging::request_logging;
pub use rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimitLayer};
pub use sanitize::sanitize_request;
pub use security::security_headers;
