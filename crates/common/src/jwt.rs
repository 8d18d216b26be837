//! Compact JWT structure checks shared across gateway crates.
//!
//! This module covers the checks that happen BEFORE any cryptography:
//! - Size limit for DoS prevention
//! - Three-segment compact serialization (`header.payload.signature`)
//! - Non-empty segments
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE splitting or decoding
//! - Nothing here verifies a signature; callers MUST verify before trusting
//!   any decoded content
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_compact, MAX_JWT_SIZE_BYTES};
//!
//! let segments = split_compact(token)?;
//! // segments.header / segments.payload / segments.signature are non-empty
//! ```

use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical HS256 member tokens are 150-300 bytes. Anything larger than this
/// limit is rejected before base64 decoding or HMAC computation.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Number of dot-separated segments in a compact JWS.
pub const JWT_SEGMENT_COUNT: usize = 3;

// =============================================================================
// Error Types
// =============================================================================

/// Structural errors for compact tokens.
///
/// Every variant displays the same generic message; the variant itself is
/// what gets logged for diagnostics.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtStructureError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token does not have exactly three segments.
    #[error("The access token is invalid or expired")]
    WrongSegmentCount,

    /// One of the three segments is empty.
    #[error("The access token is invalid or expired")]
    EmptySegment,
}

// =============================================================================
// Segments
// =============================================================================

/// The three segments of a compact token, borrowed from the raw string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CompactSegments<'a> {
    /// Base64url-encoded JOSE header.
    pub header: &'a str,
    /// Base64url-encoded claims payload.
    pub payload: &'a str,
    /// Base64url-encoded signature.
    pub signature: &'a str,
}

impl fmt::Debug for CompactSegments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompactSegments")
            .field("header_len", &self.header.len())
            .field("payload_len", &self.payload.len())
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

/// Split a compact token into its three segments.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `WrongSegmentCount` - token does not contain exactly two dots
/// - `EmptySegment` - any of the three segments is empty
pub fn split_compact(token: &str) -> Result<CompactSegments<'_>, JwtStructureError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtStructureError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtStructureError::WrongSegmentCount);
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty segment");
        return Err(JwtStructureError::EmptySegment);
    }

    Ok(CompactSegments {
        header,
        payload,
        signature,
    })
}

// =============================================================================
// Tests
// =============================================================================
