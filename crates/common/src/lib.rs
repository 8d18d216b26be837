//! Common utilities and types shared across the API gateway crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for compact JWT structure checks and size limits
pub mod jwt;
