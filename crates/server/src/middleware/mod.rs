//! HTTP middleware stack for the vote server.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors, binary only)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. No-store headers (vote route)
//! 5. Rate limiting (governor, vote route)

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::vote_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::no_store_middleware;
