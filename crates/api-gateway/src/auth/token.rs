//! Token signature and expiry validation.
//!
//! Validates HS256 tokens against the gateway's shared signing secret.
//!
//! # Security
//!
//! - Structure and size are checked BEFORE any decoding (`common::jwt`)
//! - Only HS256 is accepted; a header naming any other algorithm fails
//!   signature verification
//! - The signature is verified before the payload is trusted
//! - A token is expired once `exp <= now`, with no leeway

use crate::auth::claims::Claims;
use common::jwt::split_compact;
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::fmt;
use thiserror::Error;

/// Reasons a token fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Wrong shape, oversized, or undecodable header/payload.
    #[error("token is malformed")]
    Malformed,

    /// HMAC does not match, or the header names another algorithm.
    #[error("token signature is invalid")]
    BadSignature,

    /// `exp` is at or before the current time.
    #[error("token is expired")]
    Expired,
}

/// Stateless HS256 token validator.
///
/// Owns the decoding key derived from the signing secret at construction;
/// nothing is mutated afterwards, so one instance serves every request.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &Algorithm::HS256)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl TokenValidator {
    /// Create a validator for tokens signed with `secret`.
    pub fn new(secret: &SecretString) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so that `exp == now` counts as expired.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key,
            validation,
        }
    }

    /// Validate a token against the current time.
    ///
    /// # Errors
    ///
    /// Checks run in order and stop at the first failure:
    /// structure (`Malformed`), signature (`BadSignature`), expiry (`Expired`).
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, chrono::Utc::now().timestamp())
    }

    /// Deterministic validation against an explicit `now` (Unix seconds).
    ///
    /// Prefer [`TokenValidator::validate`] in production code.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        // 1. Structure
        split_compact(token).map_err(|e| {
            tracing::debug!(target: "gateway.auth.token", error = ?e, "Token structure check failed");
            TokenError::Malformed
        })?;

        // 2. Signature (and payload decoding, which only happens once the HMAC matches)
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let err = classify(e.kind());
                tracing::debug!(
                    target: "gateway.auth.token",
                    error = %e,
                    classified = ?err,
                    "Token verification failed"
                );
                err
            })?;
        let claims = token_data.claims;

        // 3. Expiry
        if claims.exp <= now {
            tracing::debug!(
                target: "gateway.auth.token",
                exp = claims.exp,
                now = now,
                "Token rejected: expired"
            );
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Map a `jsonwebtoken` failure onto the gateway's taxonomy.
fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    const SECRET: &str = "unit-test-signing-secret-0123456789abcdef";
    const NOW: i64 = 1_700_000_000;

    fn validator() -> TokenValidator {
        TokenValidator::new(&SecretString::from(SECRET))
    }

    fn sign(claims: &Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_returns_claims() {
        let token = sign(&json!({"exp": NOW + 60, "memberId": "user"}), SECRET);

        let claims = validator().validate_at(&token, NOW).unwrap();
        assert_eq!(claims.exp, NOW + 60);
        assert_eq!(claims.get("memberId"), Some(&json!("user")));
    }

    #[test]
    fn test_plain_string_is_malformed() {
        assert_eq!(
            validator().validate_at("invalidToken", NOW),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_empty_segments_are_malformed() {
        let token = sign(&json!({"exp": NOW + 60}), SECRET);
        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let payload = parts.next().unwrap();

        assert_eq!(
            validator().validate_at(&format!("{header}.{payload}."), NOW),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            validator().validate_at(&format!(".{payload}.sig"), NOW),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_garbage_segments_are_malformed() {
        assert_eq!(
            validator().validate_at("!!!.@@@.###", NOW),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let token = sign(
            &json!({"exp": NOW + 60, "memberId": "user"}),
            "some-other-secret-some-other-secret",
        );
        assert_eq!(
            validator().validate_at(&token, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let token = sign(&json!({"exp": NOW + 60, "memberId": "user"}), SECRET);
        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let _ = parts.next();
        let signature = parts.next().unwrap();

        let forged = URL_SAFE_NO_PAD.encode(r#"{"exp":9999999999,"memberId":"admin"}"#);
        let tampered = format!("{header}.{forged}.{signature}");

        assert_eq!(
            validator().validate_at(&tampered, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_other_algorithm_is_bad_signature() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({"exp": NOW + 60, "memberId": "user"}),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            validator().validate_at(&token, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_expired_token() {
        let token = sign(&json!({"exp": NOW - 1, "memberId": "user"}), SECRET);
        assert_eq!(
            validator().validate_at(&token, NOW),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expiry_at_exactly_now_is_expired() {
        let token = sign(&json!({"exp": NOW, "memberId": "user"}), SECRET);
        assert_eq!(
            validator().validate_at(&token, NOW),
            Err(TokenError::Expired)
        );
        assert!(validator().validate_at(&token, NOW - 1).is_ok());
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let token = sign(&json!({"memberId": "user"}), SECRET);
        assert_eq!(
            validator().validate_at(&token, NOW),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_audience_claim_is_ignored() {
        let token = sign(
            &json!({"exp": NOW + 60, "memberId": "user", "aud": "account-service"}),
            SECRET,
        );
        assert!(validator().validate_at(&token, NOW).is_ok());
    }

    #[test]
    fn test_validate_uses_wall_clock() {
        let far_future = chrono::Utc::now().timestamp() + 3600;
        let token = sign(&json!({"exp": far_future, "memberId": "user"}), SECRET);
        assert!(validator().validate(&token).is_ok());

        let past = chrono::Utc::now().timestamp() - 3600;
        let token = sign(&json!({"exp": past, "memberId": "user"}), SECRET);
        assert_eq!(validator().validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", validator());
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("HS256"));
    }
}
