//! Authentication middleware for proxied routes.
//!
//! Runs the [`AuthenticationPipeline`] on every request that reaches the
//! forwarding layer. Rejected requests never reach an upstream.

use crate::auth::{is_normalized, AuthenticationPipeline};
use crate::errors::GatewayError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Authenticate a request before it is forwarded.
///
/// # Response
///
/// - Returns 400 Bad Request for a path with dot segments or encoded
///   separators, before any exemption rule is consulted
/// - Returns 401 Unauthorized with a WWW-Authenticate header on any rejection
/// - Otherwise continues with the request, carrying `X-USER-ID` when the path
///   is secured
#[instrument(skip_all, name = "gateway.middleware.auth")]
pub async fn authenticate(
    State(pipeline): State<Arc<AuthenticationPipeline>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    if !is_normalized(req.uri().path()) {
        tracing::debug!(
            target: "gateway.middleware.auth",
            path = %req.uri().path(),
            "Request path is not normalized"
        );
        return Err(GatewayError::BadRequest(
            "Request path must not contain dot segments".to_string(),
        ));
    }

    let req = pipeline.apply(req).await.map_err(|reason| {
        tracing::debug!(
            target: "gateway.middleware.auth",
            reason = reason.as_str(),
            "Request rejected by authentication"
        );
        GatewayError::Unauthorized(reason)
    })?;

    Ok(next.run(req).await)
}
