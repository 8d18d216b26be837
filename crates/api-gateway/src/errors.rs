//! API gateway error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic; the precise cause is logged server-side.

use crate::auth::RejectReason;
use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"api-gateway\", error=\"invalid_token\"";

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
/// - BadGateway: 502 Bad Gateway
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized: {}", .0.as_str())]
    Unauthorized(RejectReason),

    #[error("No route for path: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream failure: {0}")]
    BadGateway(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthorized(_) => 401,
            GatewayError::NotFound(_) => 404,
            GatewayError::BadRequest(_) => 400,
            GatewayError::BadGateway(_) => 502,
            GatewayError::Internal => 500,
        }
    }
}

impl From<RejectReason> for GatewayError {
    fn from(reason: RejectReason) -> Self {
        GatewayError::Unauthorized(reason)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::Unauthorized(reason) => {
                tracing::debug!(
                    target: "gateway.errors",
                    reason = reason.as_str(),
                    "Rejecting unauthenticated request"
                );
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "The access token is missing, invalid or revoked".to_string(),
                )
            }
            GatewayError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "No route matches the requested path".to_string(),
            ),
            GatewayError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            GatewayError::BadGateway(reason) => {
                tracing::warn!(target: "gateway.errors", reason = %reason, "Upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "The upstream service could not be reached".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}
