//! Middleware for the API gateway.
//!
//! # Components
//!
//! - `auth` - Authentication stage run before every proxied request

pub mod auth;

pub use auth::authenticate;
