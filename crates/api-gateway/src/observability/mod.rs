//! Observability for the API gateway.

pub mod metrics;
