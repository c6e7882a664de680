//! Axum HTTP server: router, listener, graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::error::WrapError;
use crate::proxy::AddonClient;
use crate::resource::ResourceName;
use crate::stats::ProxyStats;
use crate::userdata::UserData;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub dispatcher: Dispatcher,
    pub stats: ProxyStats,
}

impl AppState {
    pub fn new(config: ProxyConfig, client: Arc<dyn AddonClient>) -> Self {
        let stats = ProxyStats::new();
        Self {
            config,
            dispatcher: Dispatcher::new(client, stats.clone()),
            stats,
        }
    }
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/stats", get(handle_get_stats))
        .route("/stremio/wrap/{user_data}/manifest.json", get(handle_manifest))
        .route(
            "/stremio/wrap/{user_data}/{resource}/{content_type}/{id}",
            get(handle_resource),
        )
        .route(
            "/stremio/wrap/{user_data}/{resource}/{content_type}/{id}/{extra}",
            get(handle_resource_with_extra),
        )
        .fallback(handle_fallback)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "wrap-proxy listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("wrap-proxy shut down gracefully");
    Ok(())
}

/// GET /stremio/wrap/{user_data}/manifest.json
async fn handle_manifest(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(user_data): Path<String>,
) -> Result<Response, WrapError> {
    let user_data: UserData = user_data.parse()?;
    let manifest = state
        .dispatcher
        .manifest(&user_data, &ctx, &state.config.manifest)
        .await?;
    Ok(axum::Json(manifest).into_response())
}

/// GET /stremio/wrap/{user_data}/{resource}/{type}/{id}.json
async fn handle_resource(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path((user_data, resource, content_type, id)): Path<(String, String, String, String)>,
) -> Result<Response, WrapError> {
    let id = strip_json_suffix(&id)?;
    serve_resource(&state, &ctx, &user_data, &resource, &content_type, id, None).await
}

/// GET /stremio/wrap/{user_data}/{resource}/{type}/{id}/{extra}.json
///
/// The extra segment is opaque to the gateway, so it is taken from the raw
/// request path instead of the percent-decoded `Path` capture.
async fn handle_resource_with_extra(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    uri: Uri,
    Path((user_data, resource, content_type, id, _)): Path<(
        String,
        String,
        String,
        String,
        String,
    )>,
) -> Result<Response, WrapError> {
    let raw_extra = uri.path().rsplit('/').next().unwrap_or_default();
    let extra = strip_json_suffix(raw_extra)?;
    serve_resource(&state, &ctx, &user_data, &resource, &content_type, &id, Some(extra)).await
}

/// Parse the path parts and hand off to the dispatcher.
///
/// If the client disconnects, axum drops this future and with it the
/// in-flight upstream call.
async fn serve_resource(
    state: &AppState,
    ctx: &RequestContext,
    user_data: &str,
    resource: &str,
    content_type: &str,
    id: &str,
    extra: Option<&str>,
) -> Result<Response, WrapError> {
    let resource: ResourceName = resource.parse()?;
    let user_data: UserData = user_data.parse()?;

    tracing::debug!(
        correlation_id = %ctx.correlation_id,
        resource = %resource,
        content_type = %content_type,
        upstreams = user_data.upstreams().len(),
        "Resource request"
    );

    state
        .dispatcher
        .dispatch(&user_data, ctx, resource, content_type, id, extra)
        .await
}

fn strip_json_suffix(segment: &str) -> Result<&str, WrapError> {
    segment.strip_suffix(".json").ok_or(WrapError::NotFound)
}

/// GET /api/stats: current gateway statistics.
async fn handle_get_stats(State(state): State<Arc<AppState>>) -> Response {
    axum::Json(state.stats.snapshot()).into_response()
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn handle_fallback() -> Response {
    WrapError::NotFound.into_response()
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, draining connections...");
}
