//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] wrappers used for the gateway's signing secret,
//! the revocation store URL (which may embed a password) and raw bearer tokens
//! held in test fixtures.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that holds one is safe to log. Secrets are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SigningConfig {
//!     algorithm: &'static str,
//!     secret: SecretString,
//! }
//!
//! let cfg = SigningConfig {
//!     algorithm: "HS256",
//!     secret: SecretString::from("0123456789abcdef0123456789abcdef"),
//! };
//!
//! assert!(!format!("{cfg:?}").contains("0123456789abcdef"));
//! let bytes: &[u8] = cfg.secret.expose_secret().as_bytes();
//! assert_eq!(bytes.len(), 32);
//! ```

pub use secrecy::{ExposeSecret, SecretString};
