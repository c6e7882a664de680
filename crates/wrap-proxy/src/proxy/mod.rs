//! Upstream addon access: the fetch collaborator seam and its HTTP implementation.

pub mod correlation;
pub mod http;

use std::net::IpAddr;

use async_trait::async_trait;
use axum::response::Response;

use crate::manifest::Manifest;
use crate::resource::ResourceName;
use crate::userdata::UpstreamConfig;

/// Everything needed to forward one resource request to one upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResourceParams {
    pub base_url: String,
    pub resource: ResourceName,
    pub content_type: String,
    /// Upstream-native id, passed through opaquely.
    pub id: String,
    /// Extra-args segment as the client sent it, still percent-encoded.
    pub extra: Option<String>,
    /// Originating client address, forwarded for per-client upstream policy.
    pub client_ip: Option<IpAddr>,
    pub correlation_id: String,
}

/// The upstream could not produce a response.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("upstream timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upstream responded with status {status}")]
    Status { status: u16 },

    #[error("upstream sent an unreadable manifest: {0}")]
    Decode(#[source] reqwest::Error),
}

impl FetchError {
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e)
        } else {
            FetchError::Request(e)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

/// Access to upstream addons.
///
/// `proxy_resource` issues exactly one outbound call and relays the upstream
/// response as-is: no retry, no caching, no rewriting. Dropping the returned
/// future cancels the outbound call.
#[async_trait]
pub trait AddonClient: Send + Sync {
    async fn proxy_resource(&self, params: ProxyResourceParams) -> Result<Response, FetchError>;

    async fn fetch_manifest(
        &self,
        upstream: &UpstreamConfig,
        client_ip: Option<IpAddr>,
        correlation_id: &str,
    ) -> Result<Manifest, FetchError>;
}
