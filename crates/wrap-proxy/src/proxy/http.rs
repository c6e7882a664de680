//! reqwest-backed [`AddonClient`].
//!
//! Resource responses are streamed back verbatim: status, end-to-end headers
//! and body bytes are relayed without parsing. Only manifests are decoded,
//! because the gateway has to merge them.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;
use url::Url;

use super::correlation::CORRELATION_HEADER;
use super::{AddonClient, FetchError, ProxyResourceParams};
use crate::config::UpstreamClientConfig;
use crate::manifest::Manifest;
use crate::userdata::UpstreamConfig;

/// Headers that should NOT be relayed (hop-by-hop headers).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
];

#[derive(Clone)]
pub struct HttpAddonClient {
    client: reqwest::Client,
}

impl HttpAddonClient {
    pub fn new(config: &UpstreamClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn get(&self, url: Url, client_ip: Option<IpAddr>, correlation_id: &str) -> reqwest::RequestBuilder {
        let mut req_builder = self
            .client
            .get(url)
            .header(CORRELATION_HEADER, correlation_id);
        if let Some(ip) = client_ip {
            let ip = ip.to_string();
            req_builder = req_builder
                .header("x-forwarded-for", &ip)
                .header("x-real-ip", ip);
        }
        req_builder
    }
}

#[async_trait]
impl AddonClient for HttpAddonClient {
    async fn proxy_resource(&self, params: ProxyResourceParams) -> Result<Response, FetchError> {
        let url = resource_url(&params)?;
        let span = wrap_tracing::upstream_forward_span!(
            &params.correlation_id,
            url.host_str().unwrap_or_default()
        );
        let start = Instant::now();

        async {
            let result = self
                .get(url, params.client_ip, &params.correlation_id)
                .send()
                .await;
            build_response(result, start, &params.correlation_id)
        }
        .instrument(span)
        .await
    }

    async fn fetch_manifest(
        &self,
        upstream: &UpstreamConfig,
        client_ip: Option<IpAddr>,
        correlation_id: &str,
    ) -> Result<Manifest, FetchError> {
        let manifest_url = upstream.manifest_url();
        let url = Url::parse(&manifest_url).map_err(|e| FetchError::InvalidUrl {
            url: manifest_url.clone(),
            reason: e.to_string(),
        })?;

        let resp = self
            .get(url, client_ip, correlation_id)
            .send()
            .await
            .map_err(FetchError::from_send)?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
            });
        }
        resp.json::<Manifest>().await.map_err(FetchError::Decode)
    }
}

/// Build `{base}/{resource}/{type}/{id}.json` or
/// `{base}/{resource}/{type}/{id}/{extra}.json`.
///
/// The id is percent-encoded as one segment. The extra segment is appended
/// exactly as the client sent it, escapes included.
pub fn resource_url(params: &ProxyResourceParams) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: params.base_url.clone(),
        reason,
    };

    let mut url = Url::parse(&params.base_url).map_err(|e| invalid(e.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| invalid("cannot be a base".to_string()))?;
        segments
            .pop_if_empty()
            .push(params.resource.as_str())
            .push(&params.content_type);
        match params.extra {
            Some(_) => segments.push(&params.id),
            None => segments.push(&format!("{}.json", params.id)),
        };
    }
    if let Some(extra) = params.extra.as_deref() {
        // `set_path` leaves existing `%XX` escapes alone.
        let path = format!("{}/{extra}.json", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Build an axum Response from the upstream reqwest result, streaming the body back.
fn build_response(
    upstream_result: Result<reqwest::Response, reqwest::Error>,
    start: Instant,
    correlation_id: &str,
) -> Result<Response, FetchError> {
    let upstream_resp = match upstream_result {
        Ok(resp) => resp,
        Err(e) => {
            let latency = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("latency_ms", latency);
            tracing::Span::current().record("status", 0_u16);

            let err = FetchError::from_send(e);
            if err.is_timeout() {
                tracing::error!(error = %err, latency_ms = latency, "Upstream timeout");
            } else {
                tracing::error!(error = %err, latency_ms = latency, "Upstream connection error");
            }
            return Err(err);
        }
    };

    let status = upstream_resp.status();
    let latency = start.elapsed().as_millis() as u64;
    tracing::Span::current().record("latency_ms", latency);
    tracing::Span::current().record("status", status.as_u16());

    tracing::info!(
        status = status.as_u16(),
        latency_ms = latency,
        "Forward complete"
    );

    let mut response_builder = Response::builder().status(status);

    for (name, value) in upstream_resp.headers().iter() {
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) || name.as_str() == CORRELATION_HEADER {
            continue;
        }
        response_builder = response_builder.header(name, value);
    }

    response_builder = response_builder.header(
        CORRELATION_HEADER,
        HeaderValue::from_str(correlation_id)
            .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
    );

    // The stream is dropped with the response if the client goes away,
    // which aborts the upstream transfer.
    let body = Body::from_stream(upstream_resp.bytes_stream());

    Ok(response_builder.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build response");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }))
}
