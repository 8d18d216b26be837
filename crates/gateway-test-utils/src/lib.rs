//! # Gateway Test Utilities
//!
//! Shared test utilities for the API gateway.
//!
//! This crate provides:
//! - Fixed signing secrets (`TEST_JWT_SECRET`, `WRONG_JWT_SECRET`)
//! - Test token builder (`TestTokenBuilder`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let upstream = wiremock::MockServer::start().await;
//!     let server = TestGatewayServer::spawn(&upstream.uri()).await?;
//!
//!     let token = TestTokenBuilder::new().for_member("user").build();
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/account/me", server.url()))
//!         .header("Authorization", token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 404);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
