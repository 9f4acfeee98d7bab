//! Consent artefacts.
//!
//! A consent authorises a specific data-flow request. The data-flow service only needs to
//! know whether the artefact exists and whether it is still granted.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use hip_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    Granted,
    Revoked,
    Expired,
}

impl ConsentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GRANTED" => Ok(Self::Granted),
            "REVOKED" => Ok(Self::Revoked),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(StoreError::Corrupt(format!("unknown consent status '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    pub consent_artefact_id: NonEmptyText,
    pub patient_id: NonEmptyText,
    pub status: ConsentStatus,
    pub created_at: DateTime<Utc>,
}

impl Consent {
    pub fn is_granted(&self) -> bool {
        self.status == ConsentStatus::Granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!("granted".parse::<ConsentStatus>().unwrap(), ConsentStatus::Granted);
        assert_eq!(" REVOKED ".parse::<ConsentStatus>().unwrap(), ConsentStatus::Revoked);
    }

    #[test]
    fn test_status_rejects_unknown_value() {
        assert!(matches!(
            "PAUSED".parse::<ConsentStatus>(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_status_display_round_trips() {
        for status in [ConsentStatus::Granted, ConsentStatus::Revoked, ConsentStatus::Expired] {
            assert_eq!(status.to_string().parse::<ConsentStatus>().unwrap(), status);
        }
    }
}
