//! md-api Middleware
//!
//! Request tracing, request ids and CORS.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use tower_http::cors::{Any, CorsLayer};
use tracing::Span;

/// Span for every request. Includes the `x-request-id` set by the outer layer
/// so log lines of one request can be grouped.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

// Configures CORS (Cross-Origin Resource Sharing)
pub fn cors_policy() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}
