//! Builder patterns for test tokens
//!
//! Provides a fluent API for creating signed tokens the gateway will (or
//! deliberately will not) accept.

use crate::crypto_fixtures::TEST_JWT_SECRET;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test tokens.
///
/// Defaults to an HS256 token signed with `TEST_JWT_SECRET`, carrying
/// `memberId = "test-member"` and expiring in one hour.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_member("alice")
///     .expires_in(60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    member_id: Option<Value>,
    exp: Option<i64>,
    extra: Map<String, Value>,
    secret: String,
    algorithm: Algorithm,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        Self {
            member_id: Some(json!("test-member")),
            exp: Some((Utc::now() + Duration::seconds(3600)).timestamp()),
            extra: Map::new(),
            secret: TEST_JWT_SECRET.to_string(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Set the member identifier
    pub fn for_member(mut self, member_id: &str) -> Self {
        self.member_id = Some(json!(member_id));
        self
    }

    /// Set `memberId` to an arbitrary JSON value (e.g. a number)
    pub fn with_member_value(mut self, value: Value) -> Self {
        self.member_id = Some(value);
        self
    }

    /// Omit `memberId` entirely
    pub fn without_member(mut self) -> Self {
        self.member_id = None;
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set an already-passed expiration
    pub fn expired(self) -> Self {
        self.expires_in(-3600)
    }

    /// Omit `exp` entirely
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Add any other claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Sign with a different secret
    pub fn signed_with(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Sign with a different HMAC algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The claims that `build` will sign
    pub fn claims(&self) -> Value {
        let mut claims = self.extra.clone();
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(member_id) = &self.member_id {
            claims.insert("memberId".to_string(), member_id.clone());
        }
        Value::Object(claims)
    }

    /// Build and sign the token
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub fn build(self) -> String {
        encode(
            &Header::new(self.algorithm),
            &self.claims(),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("test token signing should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
