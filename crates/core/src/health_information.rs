//! Link-addressed health-information payloads.

use chrono::{DateTime, Duration, Utc};
use hip_types::{NonEmptyText, SecretText};
use serde::{Deserialize, Serialize};

/// A payload parked under a link, readable by whoever presents the matching token before the
/// link expires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInformation {
    pub link_id: NonEmptyText,
    pub token: SecretText,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

impl HealthInformation {
    /// The instant after which the link no longer resolves.
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.created_at + ttl
    }

    /// Whether the link has expired at `now`. The expiry instant itself is still valid.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at(ttl) < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn information(created_at: DateTime<Utc>) -> HealthInformation {
        HealthInformation {
            link_id: NonEmptyText::new("link").unwrap(),
            token: SecretText::new("token").unwrap(),
            data: "payload".into(),
            created_at,
        }
    }

    #[test]
    fn test_is_expired_boundaries() {
        let now = Utc::now();
        let ttl = Duration::minutes(5);

        assert!(!information(now).is_expired(ttl, now));
        assert!(!information(now - ttl).is_expired(ttl, now));
        assert!(information(now - ttl - Duration::seconds(1)).is_expired(ttl, now));
    }
}
