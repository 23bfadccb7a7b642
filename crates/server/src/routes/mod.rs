//! HTTP route handlers for the vote server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (vote store reachable)
//!
//! # Votes
//! GET  /api/vote                     - Global snapshot of every voted item
//! GET  /api/vote?userId=U            - Global snapshot with U's items marked loved
//! GET  /api/vote?itemId=I[&userId=U] - Tally of one item
//! GET  /api/vote?itemIds=A,B[&userId=U] - Tallies of several items
//! POST /api/vote?itemId=I&userId=U   - Toggle U's vote on I
//! *    /api/vote                     - 405 Method not allowed
//! ```

pub mod health;
pub mod vote;

use axum::{Router, middleware::from_fn, routing::get};

use crate::middleware::{no_store_middleware, vote_rate_limiter};
use crate::state::AppState;

/// Create the health check routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create the vote routes router.
///
/// When `rate_limit` is set, the route is limited per client IP.
pub fn vote_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/api/vote",
            get(vote::read)
                .post(vote::toggle)
                .fallback(vote::method_not_allowed),
        )
        .layer(from_fn(no_store_middleware));

    if rate_limit {
        router.layer(vote_rate_limiter())
    } else {
        router
    }
}

/// Build all routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(vote_routes(rate_limit))
}
