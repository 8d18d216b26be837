//! Caller identity extraction from verified claims.

use crate::auth::claims::{Claims, MEMBER_ID_CLAIM};
use axum::http::HeaderValue;
use std::fmt;
use thiserror::Error;

/// Reasons verified claims do not yield a usable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimsError {
    /// `memberId` is absent, not a string, or empty.
    #[error("token does not carry a member identity")]
    MissingIdentity,

    /// `memberId` cannot be carried in an HTTP header value.
    #[error("member identity is not a valid header value")]
    InvalidIdentity,
}

/// The verified caller identity propagated to backends.
///
/// Always a valid header value; redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    member_id: String,
    header_value: HeaderValue,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&"[REDACTED]").finish()
    }
}

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.member_id
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.header_value
    }
}

/// Pull the member identity out of verified claims.
pub fn extract(claims: &Claims) -> Result<Identity, ClaimsError> {
    let member_id = claims
        .get(MEMBER_ID_CLAIM)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(ClaimsError::MissingIdentity)?;

    let header_value = HeaderValue::from_str(member_id).map_err(|_| {
        tracing::debug!(target: "gateway.auth.identity", "Member id is not a valid header value");
        ClaimsError::InvalidIdentity
    })?;

    Ok(Identity {
        member_id: member_id.to_string(),
        header_value,
    })
}
