//! Span builder helpers for wrap-proxy instrumentation.

/// Create a tracing span for one inbound addon resource request.
///
/// Usage: `let span = resource_request_span!(correlation_id, "catalog", content_type);`
///
/// `upstream_index` is recorded once the client-facing id has been decoded.
#[macro_export]
macro_rules! resource_request_span {
    ($correlation_id:expr, $resource:expr, $content_type:expr) => {
        tracing::info_span!(
            "resource_request",
            correlation_id = %$correlation_id,
            resource = %$resource,
            content_type = %$content_type,
            upstream_index = tracing::field::Empty,
        )
    };
}

/// Create a tracing span for the outbound call to one upstream.
#[macro_export]
macro_rules! upstream_forward_span {
    ($correlation_id:expr, $target:expr) => {
        tracing::info_span!(
            "upstream_forward",
            correlation_id = %$correlation_id,
            target = %$target,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Create a tracing span for assembling the merged manifest.
#[macro_export]
macro_rules! manifest_span {
    ($correlation_id:expr, $upstreams:expr) => {
        tracing::info_span!(
            "manifest",
            correlation_id = %$correlation_id,
            upstreams = $upstreams,
            catalogs = tracing::field::Empty,
        )
    };
}
