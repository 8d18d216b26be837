//! Deterministic signing fixtures for testing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::secret::SecretString;

/// Secret the test gateway verifies tokens with.
pub const TEST_JWT_SECRET: &str = "gateway-test-signing-secret-0123456789abcdef";

/// A different, equally valid secret; tokens signed with it must be rejected.
pub const WRONG_JWT_SECRET: &str = "some-other-issuer-signing-secret-0123456789";

/// `TEST_JWT_SECRET` as a `SecretString`.
pub fn test_jwt_secret() -> SecretString {
    SecretString::from(TEST_JWT_SECRET)
}

/// Replace a token's payload while keeping its original header and signature.
///
/// Produces the classic forged token: well-formed, but the signature no
/// longer covers the payload.
///
/// # Panics
///
/// Panics if `token` does not have three segments.
pub fn forge_payload(token: &str, payload: &serde_json::Value) -> String {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        panic!("token must have exactly three segments");
    };

    let forged = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{forged}.{signature}")
}
