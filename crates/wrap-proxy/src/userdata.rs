//! Per-request client configuration ("user data") and upstream lookup.
//!
//! User data travels in the request path as base64 encoded JSON:
//!
//! ```json
//! {"upstreams": [{"u": "https://a.example/manifest.json"}]}
//! ```
//!
//! It is decoded fresh for every request and never mutated afterwards. The
//! order of `upstreams` is the index space of [`crate::id`].

use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::id::IdError;

const MANIFEST_SUFFIX: &str = "/manifest.json";

#[derive(Debug, thiserror::Error)]
pub enum UserDataError {
    #[error("user data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("user data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("user data has no upstreams")]
    NoUpstreams,

    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidUpstream { url: String, reason: String },
}

/// One configured upstream addon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    base_url: String,
}

impl UpstreamConfig {
    /// Build from a manifest URL or base URL.
    ///
    /// A trailing `/manifest.json` and trailing slashes are removed so the
    /// result can be used as the root of forwarded resource paths.
    pub fn new(url: impl Into<String>) -> Result<Self, UserDataError> {
        let url = url.into();
        let invalid = |reason: &str| UserDataError::InvalidUpstream {
            url: url.clone(),
            reason: reason.to_string(),
        };

        let mut base = url.trim();
        if let Some(stripped) = base.strip_suffix(MANIFEST_SUFFIX) {
            base = stripped;
        }
        let base = base.trim_end_matches('/');

        let parsed = url::Url::parse(base).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            base_url: base.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn manifest_url(&self) -> String {
        format!("{}{MANIFEST_SUFFIX}", self.base_url)
    }
}

#[derive(Serialize, Deserialize)]
struct RawUpstream {
    u: String,
}

#[derive(Serialize, Deserialize)]
struct RawUserData {
    upstreams: Vec<RawUpstream>,
}

/// The ordered, non-empty list of upstreams configured by one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    upstreams: Vec<UpstreamConfig>,
}

impl UserData {
    pub fn new(upstreams: Vec<UpstreamConfig>) -> Result<Self, UserDataError> {
        if upstreams.is_empty() {
            return Err(UserDataError::NoUpstreams);
        }
        Ok(Self { upstreams })
    }

    pub fn upstreams(&self) -> &[UpstreamConfig] {
        &self.upstreams
    }

    /// Look up the upstream at `index`.
    ///
    /// Decoding already range-checks indices; this guards hand-built ids.
    pub fn resolve(&self, index: usize) -> Result<&UpstreamConfig, IdError> {
        self.upstreams
            .get(index)
            .ok_or(IdError::UpstreamIndexOutOfRange {
                index,
                count: self.upstreams.len(),
            })
    }

    /// Decode the path segment form (URL-safe or standard base64, padding optional).
    pub fn decode(segment: &str) -> Result<Self, UserDataError> {
        let trimmed = segment.trim().trim_end_matches('=');
        let bytes = match URL_SAFE_NO_PAD.decode(trimmed) {
            Ok(bytes) => bytes,
            Err(_) => STANDARD_NO_PAD.decode(trimmed)?,
        };
        let raw: RawUserData = serde_json::from_slice(&bytes)?;

        let upstreams = raw
            .upstreams
            .into_iter()
            .map(|upstream| UpstreamConfig::new(upstream.u))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(upstreams)
    }

    /// Encode into the path segment form accepted by [`UserData::decode`].
    pub fn encode(&self) -> String {
        let raw = RawUserData {
            upstreams: self
                .upstreams
                .iter()
                .map(|upstream| RawUpstream {
                    u: upstream.manifest_url(),
                })
                .collect(),
        };
        // Serializing plain strings cannot fail.
        let json = serde_json::to_vec(&raw).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }
}

impl FromStr for UserData {
    type Err = UserDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
