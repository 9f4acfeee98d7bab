//! Discovery request records.
//!
//! A discovery request is opened when a consent manager asks this HIP to discover a patient's
//! care contexts, and removed once that exchange completes or is cancelled. The pair
//! `(transaction_id, consent_manager_user_id)` identifies it.

use chrono::{DateTime, Utc};
use hip_types::NonEmptyText;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    pub transaction_id: NonEmptyText,
    pub consent_manager_user_id: NonEmptyText,
    pub timestamp: DateTime<Utc>,
}

impl DiscoveryRequest {
    /// Creates a request stamped with the current time.
    pub fn new(transaction_id: NonEmptyText, consent_manager_user_id: NonEmptyText) -> Self {
        Self {
            transaction_id,
            consent_manager_user_id,
            timestamp: Utc::now(),
        }
    }
}
