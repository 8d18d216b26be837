//! Request authentication.
//!
//! - `exemption` - path patterns that bypass authentication
//! - `token` - HS256 signature and expiry validation
//! - `revocation` - blacklist lookups against the shared store
//! - `identity` - member identity extraction from verified claims
//! - `pipeline` - the per-request state machine composing the above

pub mod claims;
pub mod exemption;
pub mod identity;
pub mod pipeline;
pub mod revocation;
pub mod token;

pub use exemption::{is_normalized, ExemptionMatcher, PathPattern, PatternError};
pub use pipeline::{AuthDecision, AuthenticationPipeline, RejectReason, IDENTITY_HEADER};
pub use revocation::{RedisRevocationStore, RevocationCache, RevocationStore, StoreError};
pub use token::{TokenError, TokenValidator};
