//! Caller-facing error values.
//!
//! The data-flow service never panics or raises on a refused request. Every refusal is an
//! [`ErrorRepresentation`]: a code the caller can act on plus a fixed human-readable message.
//!
//! Serialized shape:
//!
//! ```json
//! { "error": { "code": "LinkExpired", "message": "Link has expired" } }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    ServerInternalError,
    HealthInformationNotFound,
    InvalidToken,
    LinkExpired,
    ConsentNotFound,
    ConsentNotGranted,
}

/// Fixed messages paired with each [`ErrorCode`].
pub struct ErrorMessage;

impl ErrorMessage {
    pub const INTERNAL_SERVER_ERROR: &'static str = "Internal server error";
    pub const HEALTH_INFORMATION_NOT_FOUND: &'static str = "Health information not found";
    pub const INVALID_TOKEN: &'static str = "Invalid token";
    pub const LINK_EXPIRED: &'static str = "Link has expired";
    pub const CONSENT_NOT_FOUND: &'static str = "Consent artefact not found";
    pub const CONSENT_NOT_GRANTED: &'static str = "Consent artefact is not granted";
}

impl ErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            Self::ServerInternalError => ErrorMessage::INTERNAL_SERVER_ERROR,
            Self::HealthInformationNotFound => ErrorMessage::HEALTH_INFORMATION_NOT_FOUND,
            Self::InvalidToken => ErrorMessage::INVALID_TOKEN,
            Self::LinkExpired => ErrorMessage::LINK_EXPIRED,
            Self::ConsentNotFound => ErrorMessage::CONSENT_NOT_FOUND,
            Self::ConsentNotGranted => ErrorMessage::CONSENT_NOT_GRANTED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Self::new(code, code.message())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error}")]
pub struct ErrorRepresentation {
    pub error: Error,
}

impl ErrorRepresentation {
    pub fn new(error: Error) -> Self {
        Self { error }
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code
    }
}

impl From<ErrorCode> for ErrorRepresentation {
    fn from(code: ErrorCode) -> Self {
        Self::new(Error::from(code))
    }
}
