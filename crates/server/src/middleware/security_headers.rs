//! Response headers for vote state.
//!
//! Vote tallies are per-viewer and change on every toggle, so they must never
//! be stored by browsers or intermediaries.

use axum::{
    extract::Request,
    http::{
        HeaderValue,
        header::{CACHE_CONTROL, X_CONTENT_TYPE_OPTIONS},
    },
    middleware::Next,
    response::Response,
};

/// Mark responses as uncacheable and non-sniffable.
///
/// Headers applied:
/// - `Cache-Control: no-store` - Tallies are per-viewer and short-lived
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
pub async fn no_store_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    response
}
