//! Request forwarding.
//!
//! Relays an (already authenticated) request to the upstream chosen by the
//! route table and streams the upstream response back. Hop-by-hop headers are
//! dropped in both directions. Redirects are relayed, never followed.

use crate::errors::GatewayError;
use crate::observability::metrics::record_upstream_request;
use crate::routes::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName},
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Largest request body the gateway buffers before forwarding.
pub const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that describe a single connection and must not be forwarded.
static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the HTTP client used for upstream calls.
///
/// # Errors
///
/// Returns the reqwest error if the TLS backend cannot be initialized.
pub fn build_upstream_client(request_timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Fallback handler forwarding every non-gateway path upstream.
#[instrument(
    skip_all,
    name = "gateway.proxy.forward",
    fields(method = %req.method(), path = %req.uri().path())
)]
pub async fn forward(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();

    let route = state.routes.resolve(path).ok_or_else(|| {
        tracing::debug!(target: "gateway.proxy", path = %path, "No route for path");
        GatewayError::NotFound(path.to_string())
    })?;

    let target = route
        .target_url(path, parts.uri.query())
        .ok_or_else(|| GatewayError::BadRequest("Request path cannot be forwarded".to_string()))?;

    let body = axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES)
        .await
        .map_err(|e| {
            tracing::debug!(target: "gateway.proxy", error = %e, "Failed to read request body");
            GatewayError::BadRequest("Request body is too large or unreadable".to_string())
        })?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let start = Instant::now();
    let upstream = state
        .http_client
        .request(parts.method, target)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => {
            record_upstream_request(Some(response.status().as_u16()), start.elapsed());
            response
        }
        Err(e) => {
            record_upstream_request(None, start.elapsed());
            return Err(GatewayError::BadGateway(e.to_string()));
        }
    };

    tracing::debug!(
        target: "gateway.proxy",
        status = upstream.status().as_u16(),
        upstream = %route.upstream(),
        "Upstream responded"
    );

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;

    Ok(response)
}

/// Remove hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("token"));
        headers.insert("x-user-id", HeaderValue::from_static("user"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key(header::AUTHORIZATION));
        assert!(headers.contains_key("x-user-id"));
    }

    #[test]
    fn test_strip_headers_named_by_connection() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONNECTION,
            HeaderValue::from_static("close, x-internal-hop"),
        );
        headers.insert("x-internal-hop", HeaderValue::from_static("1"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key("x-internal-hop"));
        assert!(headers.contains_key("x-request-id"));
    }

    #[test]
    fn test_build_upstream_client() {
        assert!(build_upstream_client(Duration::from_secs(5)).is_ok());
    }
}
