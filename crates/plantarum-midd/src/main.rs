//! plantarum-midd server binary.
//!
//! Configuration comes from environment variables (see `MiddConfig::from_env`).

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use plantarum_core::{init_tracing, MiddConfig};
use plantarum_evm::{ChainReader, RpcChainReader};
use plantarum_ipfs::{GatewayResolver, PinataClient};
use plantarum_midd::{router, AppState, ChainContext};
use plantarum_rpc::{HttpClientConfig, HttpRpcClient};

#[tokio::main]
async fn main() -> Result<()> {
    let config = MiddConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.log);

    let pinata = PinataClient::new(&config.pinata).context("failed to build Pinata client")?;
    let shutdown = CancellationToken::new();
    let mut state = AppState::new(config.service_name.clone(), Arc::new(pinata))
        .with_body_limit(config.max_body_bytes)
        .with_shutdown(shutdown.clone());

    match &config.chain {
        Some(chain) => {
            let rpc = HttpRpcClient::new(
                chain.rpc_url.clone(),
                HttpClientConfig {
                    request_timeout: Duration::from_millis(chain.request_timeout_ms),
                    ..HttpClientConfig::default()
                },
            )
            .context("failed to build RPC client")?;
            let reader: Arc<dyn ChainReader> = Arc::new(RpcChainReader::new(rpc));
            let resolver = GatewayResolver::new(config.gateways.clone(), Duration::from_secs(15))
                .context("failed to build gateway client")?;
            let ctx = ChainContext::from_config(reader, &config)
                .context("invalid built-in event signatures")?
                .with_metadata(Arc::new(resolver));
            tracing::info!(rpc = %chain.rpc_url, step = chain.log_step, "chain routes enabled");
            state = state.with_chain(ctx);
        }
        None => tracing::warn!("RPC_URL not set; chain routes will answer 503"),
    }

    let app = router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, service = %config.service_name, "middleware listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await
        .context("server error")?;
    Ok(())
}
