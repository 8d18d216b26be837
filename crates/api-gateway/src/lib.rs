//! API Gateway Library
//!
//! The request-authentication stage of an API gateway, plus the thin
//! forwarding layer it sits in front of:
//!
//! - Path exemption rules deciding which requests need a token
//! - HS256 token validation (signature, then expiry)
//! - Revocation lookups against a shared Redis store, failing closed
//! - Caller identity propagation to backends via `X-USER-ID`
//!
//! # Request Flow
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/pipeline.rs -> handlers/proxy.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Exemption, token, revocation, identity and the pipeline
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - Health, metrics and forwarding handlers
//! - `middleware` - Authentication middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup and the upstream route table

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
