//! HTTP routes for the API gateway.
//!
//! Defines the Axum router and application state.

pub mod table;

use crate::auth::AuthenticationPipeline;
use crate::handlers;
use crate::middleware::authenticate;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;
pub use table::{RouteEntry, RouteError, RouteTable};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication stage run before forwarding.
    pub pipeline: Arc<AuthenticationPipeline>,

    /// Ordered upstream routes.
    pub routes: RouteTable,

    /// Client for upstream calls.
    pub http_client: reqwest::Client,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Revocation store ping - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - every other path - authenticated, then forwarded per the route table
/// - TraceLayer for request logging
/// - `request_timeout` bound on each request
pub fn build_routes(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    // Gateway-owned routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Everything else is authenticated and proxied. Authentication runs
    // before route lookup, so an unknown path without a token is a 401.
    let proxied_routes = Router::new()
        .fallback(handlers::forward)
        .layer(middleware::from_fn_with_state(
            state.pipeline.clone(),
            authenticate,
        ))
        .with_state(state);

    // Layer order (inner to outer):
    // 1. TraceLayer - Log request details
    // 2. TimeoutLayer - Bound the whole request, forwarding included
    public_routes
        .merge(metrics_routes)
        .merge(proxied_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}
