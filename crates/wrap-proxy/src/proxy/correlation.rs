//! Correlation ID generation for request tracing.

use axum::http::HeaderMap;
use uuid::Uuid;

/// Header carrying the correlation id to upstreams and back to the client.
pub const CORRELATION_HEADER: &str = "x-wrap-request-id";

/// Generate a new correlation ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Reuse the caller's correlation id when it sent one, otherwise mint one.
pub fn from_headers(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(generate_id)
}
