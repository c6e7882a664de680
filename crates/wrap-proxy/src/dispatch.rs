//! Per-resource entry points: decode the client-facing id, resolve the
//! upstream, forward.
//!
//! Every resource shares [`Dispatcher::forward`]; an entry point only fixes
//! the resource name and whether extra args are allowed. Decoding always
//! finishes before any upstream is contacted.

use std::sync::Arc;

use axum::response::Response;
use tracing::Instrument;

use crate::config::ManifestConfig;
use crate::context::RequestContext;
use crate::error::WrapError;
use crate::id;
use crate::manifest::{self, Manifest};
use crate::proxy::{AddonClient, ProxyResourceParams};
use crate::resource::ResourceName;
use crate::stats::ProxyStats;
use crate::userdata::UserData;

#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn AddonClient>,
    stats: ProxyStats,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn AddonClient>, stats: ProxyStats) -> Self {
        Self { client, stats }
    }

    pub async fn fetch_catalog(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        content_type: &str,
        id: &str,
        extra: Option<&str>,
    ) -> Result<Response, WrapError> {
        self.forward(user_data, ctx, ResourceName::Catalog, content_type, id, extra)
            .await
    }

    pub async fn fetch_addon_catalog(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        content_type: &str,
        id: &str,
    ) -> Result<Response, WrapError> {
        self.forward(user_data, ctx, ResourceName::AddonCatalog, content_type, id, None)
            .await
    }

    pub async fn fetch_meta(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        content_type: &str,
        id: &str,
    ) -> Result<Response, WrapError> {
        self.forward(user_data, ctx, ResourceName::Meta, content_type, id, None)
            .await
    }

    pub async fn fetch_stream(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        content_type: &str,
        id: &str,
    ) -> Result<Response, WrapError> {
        self.forward(user_data, ctx, ResourceName::Stream, content_type, id, None)
            .await
    }

    pub async fn fetch_subtitles(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        content_type: &str,
        id: &str,
        extra: Option<&str>,
    ) -> Result<Response, WrapError> {
        self.forward(user_data, ctx, ResourceName::Subtitles, content_type, id, extra)
            .await
    }

    /// Route a parsed resource request to its entry point.
    pub async fn dispatch(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        resource: ResourceName,
        content_type: &str,
        id: &str,
        extra: Option<&str>,
    ) -> Result<Response, WrapError> {
        let extra = extra.filter(|e| !e.is_empty());
        if extra.is_some() && !resource.accepts_extra() {
            return Err(WrapError::UnexpectedExtra { resource });
        }

        match resource {
            ResourceName::Catalog => {
                self.fetch_catalog(user_data, ctx, content_type, id, extra)
                    .await
            }
            ResourceName::AddonCatalog => {
                self.fetch_addon_catalog(user_data, ctx, content_type, id)
                    .await
            }
            ResourceName::Meta => self.fetch_meta(user_data, ctx, content_type, id).await,
            ResourceName::Stream => self.fetch_stream(user_data, ctx, content_type, id).await,
            ResourceName::Subtitles => {
                self.fetch_subtitles(user_data, ctx, content_type, id, extra)
                    .await
            }
        }
    }

    /// Fetch every upstream manifest and merge them under `identity`.
    pub async fn manifest(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        identity: &ManifestConfig,
    ) -> Result<Manifest, WrapError> {
        let span = wrap_tracing::manifest_span!(&ctx.correlation_id, user_data.upstreams().len());
        self.merge_upstream_manifests(user_data, ctx, identity)
            .instrument(span)
            .await
    }

    async fn merge_upstream_manifests(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        identity: &ManifestConfig,
    ) -> Result<Manifest, WrapError> {
        self.stats.inc_manifests();
        let fetches = user_data.upstreams().iter().map(|upstream| {
            self.client
                .fetch_manifest(upstream, ctx.client_ip, &ctx.correlation_id)
        });
        let upstreams = match futures::future::try_join_all(fetches).await {
            Ok(upstreams) => upstreams,
            Err(e) => {
                self.stats.inc_upstream_failures();
                tracing::warn!(error = %e, "Upstream manifest fetch failed");
                return Err(e.into());
            }
        };

        let merged = manifest::merge(identity, user_data, upstreams);
        tracing::Span::current().record("catalogs", merged.catalogs.len());
        Ok(merged)
    }

    async fn forward(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        resource: ResourceName,
        content_type: &str,
        id: &str,
        extra: Option<&str>,
    ) -> Result<Response, WrapError> {
        let span = wrap_tracing::resource_request_span!(&ctx.correlation_id, resource, content_type);
        self.decode_and_forward(user_data, ctx, resource, content_type, id, extra)
            .instrument(span)
            .await
    }

    async fn decode_and_forward(
        &self,
        user_data: &UserData,
        ctx: &RequestContext,
        resource: ResourceName,
        content_type: &str,
        id: &str,
        extra: Option<&str>,
    ) -> Result<Response, WrapError> {
        self.stats.inc_requests();

        let composite = match id::decode(id, user_data) {
            Ok(composite) => composite,
            Err(e) => {
                self.stats.inc_rejected_ids();
                tracing::warn!(error = %e, "Rejected client id");
                return Err(e.into());
            }
        };
        let upstream = user_data.resolve(composite.upstream_index)?;
        tracing::Span::current().record("upstream_index", composite.upstream_index);

        let params = ProxyResourceParams {
            base_url: upstream.base_url().to_string(),
            resource,
            content_type: content_type.to_string(),
            id: composite.native_id,
            extra: extra.map(str::to_string),
            client_ip: ctx.client_ip,
            correlation_id: ctx.correlation_id.clone(),
        };

        match self.client.proxy_resource(params).await {
            Ok(resp) => {
                self.stats.inc_forwarded();
                Ok(resp)
            }
            Err(e) => {
                self.stats.inc_upstream_failures();
                Err(e.into())
            }
        }
    }
}
