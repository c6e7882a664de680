//! Per-request caller context.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::proxy::correlation;
use crate::server::AppState;

/// Caller information carried from the inbound request to the upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub client_ip: Option<IpAddr>,
    pub correlation_id: String,
}

impl RequestContext {
    pub fn new(client_ip: Option<IpAddr>, correlation_id: impl Into<String>) -> Self {
        Self {
            client_ip,
            correlation_id: correlation_id.into(),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip());
        let client_ip = client_ip(
            &parts.headers,
            peer,
            state.config.server.trust_forwarded_for,
        );
        Ok(Self {
            client_ip,
            correlation_id: correlation::from_headers(&parts.headers),
        })
    }
}

/// Resolve the originating client address.
///
/// Forwarding headers are only honored when the deployment says a trusted
/// reverse proxy sets them; otherwise they are trivially spoofable.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded: bool) -> Option<IpAddr> {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok());
        if real_ip.is_some() {
            return real_ip;
        }
    }
    peer
}
