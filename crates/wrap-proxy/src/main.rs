//! wrap-proxy binary: load config, initialize tracing, serve.

use std::sync::Arc;

use wrap_proxy::proxy::http::HttpAddonClient;
use wrap_proxy::{server, AppState, ProxyConfig};

fn main() -> anyhow::Result<()> {
    // Determine config path
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        // Check for --config flag first
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            // Fall back to positional arg
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("WRAP_PROXY_CONFIG").ok())
            .unwrap_or_else(|| "wrap-proxy.toml".to_string())
    };

    let config = ProxyConfig::load(&config_path)?;

    // Build the tokio runtime first: the tonic gRPC exporter needs a reactor context
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let tracing_guard = wrap_tracing::init_tracing(&config.tracing);

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address,
            upstream_timeout_secs = config.upstream.timeout_secs,
            trust_forwarded_for = config.server.trust_forwarded_for,
            otlp_export = tracing_guard.is_exporting(),
            "Starting wrap-proxy"
        );

        let result = run(config).await;
        drop(tracing_guard);
        result
    })
}

async fn run(config: ProxyConfig) -> anyhow::Result<()> {
    let client = HttpAddonClient::new(&config.upstream)?;
    let state = AppState::new(config, Arc::new(client));
    server::run(state).await
}
