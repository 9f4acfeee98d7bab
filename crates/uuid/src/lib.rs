//! Canonical identifier utilities.
//!
//! HIP hands out identifiers that callers must echo back later: link ids under which
//! health-information payloads are parked, the access tokens that unlock them, and
//! transaction ids generated for requests that arrive without one.
//!
//! All of these use one *canonical* representation: **32 lowercase hexadecimal characters**
//! (no hyphens). Comparing a presented value against a stored one is then a plain string
//! comparison with no normalisation step.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers must already be canonical. Use [`CanonicalId::parse`] to
//! validate one; uppercase, hyphenated, wrong-length or non-hex values are rejected.

mod service;

pub use service::{CanonicalId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
