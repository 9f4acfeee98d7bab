//! Validated text types shared across HIP crates.

use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, so
/// identifiers such as transaction ids compare equal regardless of stray padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NonEmptyText::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Non-empty text that must never appear in logs.
///
/// Used for access tokens. `Debug` prints a placeholder; the raw value is only reachable
/// through [`SecretText::expose`]. Unlike [`NonEmptyText`] the value is kept verbatim, since a
/// token with surrounding whitespace is a different token.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretText(String);

impl SecretText {
    /// Wraps a secret value.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the input is empty or whitespace only.
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let value = input.into();
        if value.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(value))
    }

    /// Returns the raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether `presented` equals the stored secret, compared in constant time.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for SecretText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretText(***)")
    }
}

impl serde::Serialize for SecretText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SecretText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SecretText::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  tx-1  ").expect("should accept padded text");
        assert_eq!(text.as_str(), "tx-1");
    }

    #[test]
    fn test_non_empty_text_rejects_blank() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
        assert_eq!("".parse::<NonEmptyText>(), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_empty_string() {
        let err = serde_json::from_str::<NonEmptyText>("\"\"");
        assert!(err.is_err(), "empty JSON string should be rejected");
    }

    #[test]
    fn test_secret_text_debug_is_redacted() {
        let secret = SecretText::new("super-secret").unwrap();
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_secret_text_matches_exact_value_only() {
        let secret = SecretText::new("abc").unwrap();
        assert!(secret.matches("abc"));
        assert!(!secret.matches(" abc"));
        assert!(!secret.matches("ABC"));
    }

    #[test]
    fn test_secret_text_rejects_prefix_and_extension() {
        let secret = SecretText::new("token-1234").unwrap();
        assert!(!secret.matches("token-123"));
        assert!(!secret.matches("token-12345"));
        assert!(!secret.matches("token-1235"));
    }
}
