//! Internal implementation of canonical identifiers.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// HIP's canonical identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed the contained UUID is guaranteed to render in canonical form, so two
/// identifiers can be compared by their string value.
///
/// # When to use this type
/// - Allocating a link id for a health-information payload.
/// - Allocating the access token that guards a link.
/// - Generating a transaction id for a request that did not carry one.
///
/// # Construction
/// - [`CanonicalId::new`] generates a fresh random (v4) identifier.
/// - [`CanonicalId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalId(Uuid);

impl Default for CanonicalId {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalId {
    /// Generates a new identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (hyphenated or uppercase).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "identifier must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }

        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("'{}': {}", input, e)))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes, each one of `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for CanonicalId {
    type Err = UuidError;

    /// Equivalent to [`CanonicalId::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CanonicalId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CanonicalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CanonicalId::parse(&s).map_err(serde::de::Error::custom)
    }
}
