//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use wrap_tracing::TracingConfig;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamClientConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a reverse proxy that sets these headers.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

/// Outbound HTTP client settings shared by all upstream calls.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamClientConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Identity of the merged addon presented to clients.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_id")]
    pub id: String,
    #[serde(default = "default_manifest_name")]
    pub name: String,
    #[serde(default = "default_manifest_version")]
    pub version: String,
    #[serde(default = "default_manifest_description")]
    pub description: String,
    #[serde(default)]
    pub logo: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0:7070".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("addon-wrap/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_manifest_id() -> String {
    "wrap.addon".to_string()
}

fn default_manifest_name() -> String {
    "Wrap".to_string()
}

fn default_manifest_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_manifest_description() -> String {
    "Several addons behind one".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            id: default_manifest_id(),
            name: default_manifest_name(),
            version: default_manifest_version(),
            description: default_manifest_description(),
            logo: None,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (WRAP_ prefix, __ for nesting)
    /// 2. TOML config file
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config: ProxyConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WRAP_").split("__"))
            .extract()?;

        Ok(config)
    }
}
