//! Per-request authentication pipeline.
//!
//! ```text
//! Start -> PathChecked -> Exempt
//!                      -> HeaderChecked -> SignatureChecked -> RevocationChecked
//!                         -> ClaimsExtracted -> Authorized
//! (any step) -> Rejected(reason)
//! ```
//!
//! The pipeline is read-only with respect to process state. The only thing it
//! mutates is the request it was handed, and only on `Authorized`.

use crate::auth::exemption::ExemptionMatcher;
use crate::auth::identity::{self, ClaimsError, Identity};
use crate::auth::revocation::{RevocationCache, StoreError};
use crate::auth::token::{TokenError, TokenValidator};
use crate::observability::metrics::record_auth_decision;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, Request};
use tracing::instrument;

/// Header carrying the verified caller identity to backends.
pub static IDENTITY_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Why a token was judged invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTokenCause {
    Token(TokenError),
    Claims(ClaimsError),
}

/// Why a token was judged revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokedCause {
    /// The revocation key exists.
    Listed,
    /// The store could not answer; treated as revoked.
    StoreUnavailable,
}

/// Rejection reasons. All of them end the request with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoAuthHeader,
    InvalidToken(InvalidTokenCause),
    Revoked(RevokedCause),
}

impl RejectReason {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoAuthHeader => "no_auth_header",
            RejectReason::InvalidToken(InvalidTokenCause::Token(TokenError::Malformed)) => {
                "malformed"
            }
            RejectReason::InvalidToken(InvalidTokenCause::Token(TokenError::BadSignature)) => {
                "bad_signature"
            }
            RejectReason::InvalidToken(InvalidTokenCause::Token(TokenError::Expired)) => "expired",
            RejectReason::InvalidToken(InvalidTokenCause::Claims(ClaimsError::MissingIdentity)) => {
                "missing_identity"
            }
            RejectReason::InvalidToken(InvalidTokenCause::Claims(ClaimsError::InvalidIdentity)) => {
                "invalid_identity"
            }
            RejectReason::Revoked(RevokedCause::Listed) => "revoked",
            RejectReason::Revoked(RevokedCause::StoreUnavailable) => "store_unavailable",
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Exempt,
    Authorized(Identity),
    Rejected(RejectReason),
}

impl AuthDecision {
    fn outcome(&self) -> &'static str {
        match self {
            AuthDecision::Exempt => "exempt",
            AuthDecision::Authorized(_) => "authorized",
            AuthDecision::Rejected(reason) => reason.as_str(),
        }
    }
}

/// The authentication stage, composed from its collaborators at startup.
pub struct AuthenticationPipeline {
    matcher: ExemptionMatcher,
    validator: TokenValidator,
    revocation: RevocationCache,
}

impl AuthenticationPipeline {
    pub fn new(
        matcher: ExemptionMatcher,
        validator: TokenValidator,
        revocation: RevocationCache,
    ) -> Self {
        Self {
            matcher,
            validator,
            revocation,
        }
    }

    pub fn revocation(&self) -> &RevocationCache {
        &self.revocation
    }

    /// Decide what happens to a request with this path and these headers.
    ///
    /// Reads nothing but its inputs and the revocation store, so running it
    /// twice against an unchanged store gives the same answer.
    #[instrument(skip_all, name = "gateway.auth.decide", fields(path = %path))]
    pub async fn decide(&self, path: &str, headers: &HeaderMap) -> AuthDecision {
        let decision = self.evaluate(path, headers).await;
        let outcome = decision.outcome();

        match &decision {
            AuthDecision::Rejected(_) => {
                tracing::debug!(target: "gateway.auth.pipeline", outcome, "Request rejected");
            }
            _ => {
                tracing::trace!(target: "gateway.auth.pipeline", outcome, "Request accepted");
            }
        }
        record_auth_decision(outcome);

        decision
    }

    async fn evaluate(&self, path: &str, headers: &HeaderMap) -> AuthDecision {
        // PathChecked
        if !self.matcher.is_secured(path) {
            return AuthDecision::Exempt;
        }

        // HeaderChecked
        let Some(raw) = headers.get(AUTHORIZATION) else {
            return AuthDecision::Rejected(RejectReason::NoAuthHeader);
        };
        let Ok(token) = raw.to_str() else {
            return AuthDecision::Rejected(RejectReason::InvalidToken(InvalidTokenCause::Token(
                TokenError::Malformed,
            )));
        };

        // SignatureChecked
        let claims = match self.validator.validate(token) {
            Ok(claims) => claims,
            Err(e) => {
                return AuthDecision::Rejected(RejectReason::InvalidToken(
                    InvalidTokenCause::Token(e),
                ))
            }
        };

        // RevocationChecked (fail-closed)
        match self.revocation.is_revoked(token).await {
            Ok(false) => {}
            Ok(true) => return AuthDecision::Rejected(RejectReason::Revoked(RevokedCause::Listed)),
            Err(e) => {
                log_store_error(&e);
                return AuthDecision::Rejected(RejectReason::Revoked(
                    RevokedCause::StoreUnavailable,
                ));
            }
        }

        // ClaimsExtracted
        match identity::extract(&claims) {
            Ok(identity) => AuthDecision::Authorized(identity),
            Err(e) => AuthDecision::Rejected(RejectReason::InvalidToken(
                InvalidTokenCause::Claims(e),
            )),
        }
    }

    /// Run the pipeline on a request and hand back the request to forward.
    ///
    /// On `Authorized` the request carries exactly one identity header; any
    /// client-supplied value is replaced. On `Exempt` it is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason; the request is dropped unmodified.
    pub async fn apply<B>(&self, mut req: Request<B>) -> Result<Request<B>, RejectReason> {
        let decision = self.decide(req.uri().path(), req.headers()).await;

        match decision {
            AuthDecision::Exempt => Ok(req),
            AuthDecision::Authorized(identity) => {
                req.headers_mut()
                    .insert(IDENTITY_HEADER.clone(), identity.header_value().clone());
                Ok(req)
            }
            AuthDecision::Rejected(reason) => Err(reason),
        }
    }
}

fn log_store_error(err: &StoreError) {
    tracing::warn!(
        target: "gateway.auth.pipeline",
        error = %err,
        "Revocation status unknown, rejecting request"
    );
}
