//! API Gateway
//!
//! Authenticates every inbound request and forwards it to the upstream
//! service chosen by the route table.

use anyhow::Context;
use api_gateway::auth::{
    AuthenticationPipeline, RedisRevocationStore, RevocationCache, TokenValidator,
};
use api_gateway::config::Config;
use api_gateway::handlers::proxy::build_upstream_client;
use api_gateway::routes::{self, init_metrics_recorder, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting API Gateway");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        exempt_rules = config.exempt_paths.rules().len(),
        routes = config.routes.entries().len(),
        revocation_timeout_ms = config.revocation_timeout.as_millis() as u64,
        jwt_secret_bytes = config.jwt_secret_len(),
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        anyhow::anyhow!(e)
    })?;

    info!("Connecting to revocation store...");
    let store = RedisRevocationStore::connect(&config.redis_url)
        .await
        .context("Failed to connect to revocation store")?;
    info!("Revocation store connection established");

    let pipeline = AuthenticationPipeline::new(
        config.exempt_paths.clone(),
        TokenValidator::new(&config.jwt_secret),
        RevocationCache::new(Arc::new(store), config.revocation_timeout),
    );

    let http_client = build_upstream_client(config.request_timeout)
        .context("Failed to build upstream HTTP client")?;

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        routes: config.routes.clone(),
        http_client,
    });

    let app = routes::build_routes(state, metrics_handle, config.request_timeout);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("API Gateway listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.drain_period))
    .await?;

    info!("API Gateway shutdown complete");

    Ok(())
}

/// Text logs by default; JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_gateway=debug,tower_http=debug".into()),
        )
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Skipping drain period (GATEWAY_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {:?}...", drain_period);
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }
}
