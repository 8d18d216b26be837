//! Health check handler.
//!
//! Provides the liveness/readiness probe. Never authenticated.

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Health check response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: &'static str,

    /// Revocation store reachability.
    pub revocation_store: &'static str,
}

/// Health check handler.
///
/// Pings the revocation store. An unreachable store means every secured
/// request is being rejected, so the gateway reports itself unhealthy with a
/// 503 so the orchestrator stops routing traffic to it.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "revocation_store": "healthy"
/// }
/// ```
#[instrument(skip_all, name = "gateway.health.check")]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.pipeline.revocation().store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                revocation_store: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "gateway.health", error = %e, "Revocation store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    revocation_store: "unhealthy",
                }),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::revocation::mock::{InMemoryRevocationStore, UnavailableRevocationStore};
    use crate::auth::revocation::{RevocationStore, DEFAULT_LOOKUP_TIMEOUT};
    use crate::auth::{AuthenticationPipeline, ExemptionMatcher, RevocationCache, TokenValidator};
    use crate::routes::table::RouteTable;
    use common::secret::SecretString;

    fn state(store: Arc<dyn RevocationStore>) -> Arc<AppState> {
        let pipeline = AuthenticationPipeline::new(
            ExemptionMatcher::default(),
            TokenValidator::new(&SecretString::from("health-test-secret-0123456789abcdef")),
            RevocationCache::new(store, DEFAULT_LOOKUP_TIMEOUT),
        );
        Arc::new(AppState {
            pipeline: Arc::new(pipeline),
            routes: RouteTable::default(),
            http_client: reqwest::Client::new(),
        })
    }

    #[tokio::test]
    async fn test_healthy_when_store_reachable() {
        let (status, Json(body)) =
            health_check(State(state(Arc::new(InMemoryRevocationStore::new())))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn test_unhealthy_when_store_unreachable() {
        let (status, Json(body)) =
            health_check(State(state(Arc::new(UnavailableRevocationStore)))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            HealthResponse {
                status: "unhealthy",
                revocation_store: "unhealthy",
            }
        );
    }
}
