//! JWT claims structure.
//!
//! Contains the claims decoded from a verified token. The member identifier is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of the claim carrying the caller's member identifier.
pub const MEMBER_ID_CLAIM: &str = "memberId";

/// Claims decoded from a verified token.
///
/// Only `exp` is required by the gateway itself; everything else the issuer
/// put in the payload is kept in `fields` untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Every other claim, including `memberId`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Custom Debug implementation that redacts the member identifier.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        f.debug_struct("Claims")
            .field("exp", &self.exp)
            .field("memberId", &"[REDACTED]")
            .field("fields", &names)
            .finish()
    }
}

impl Claims {
    /// Look up an issuer-chosen claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
