//! Health-information data flow.
//!
//! This module orchestrates the exchange of health information once a consent manager has
//! obtained consent:
//!
//! 1. [`DataFlowService::health_information_request_for`] checks the consent, stores the
//!    request under its transaction id, and hands it to the collection pipeline.
//! 2. [`DataFlowService::entry_for`] packages a collected payload for push: small payloads go
//!    inline, payloads over the size limit are parked behind a link and token.
//! 3. [`DataFlowService::health_information_for`] resolves such a link, checking the token and
//!    the link's time-to-live.
//!
//! Every operation returns `Result<_, ErrorRepresentation>`. Store and queue failures are
//! logged here and surface to the caller only as `ServerInternalError`.
//!
//! ## Resolution order
//!
//! A link lookup is checked in a fixed order: unknown link, then token, then expiry. A
//! request with a wrong token for an expired link is reported as `InvalidToken`.

use crate::config::DataFlowConfig;
use crate::error_representation::{ErrorCode, ErrorRepresentation};
use crate::health_information::HealthInformation;
use crate::messaging::{DataFlowMessage, MessagingQueue};
use crate::repositories::{ConsentRepository, DataFlowRepository, HealthInformationRepository};
use chrono::{DateTime, Utc};
use hip_types::{NonEmptyText, SecretText};
use hip_uuid::CanonicalId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRef {
    pub id: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhPublicKey {
    pub expiry: DateTime<Utc>,
    pub parameters: String,
    pub key_value: String,
}

/// Key material the requester supplies so pushed data can be encrypted for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMaterial {
    pub crypto_alg: String,
    pub curve: String,
    pub dh_public_key: DhPublicKey,
    pub nonce: String,
}

/// A consent manager's request for the health information covered by a consent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInformationRequest {
    pub transaction_id: NonEmptyText,
    pub consent: ConsentRef,
    pub hi_data_range: DateRange,
    pub data_push_url: String,
    pub key_material: KeyMaterial,
}

impl HealthInformationRequest {
    fn to_message(&self) -> DataFlowMessage {
        DataFlowMessage {
            transaction_id: self.transaction_id.clone(),
            consent_id: self.consent.id.clone(),
            hi_data_range: self.hi_data_range.clone(),
            data_push_url: self.data_push_url.clone(),
            key_material: self.key_material.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInformationResponse {
    pub transaction_id: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl HealthInformationResponse {
    pub fn acknowledged(transaction_id: NonEmptyText) -> Self {
        Self {
            transaction_id,
            data: None,
        }
    }

    pub fn with_data(transaction_id: NonEmptyText, data: String) -> Self {
        Self {
            transaction_id,
            data: Some(data),
        }
    }
}

/// A payload packaged for push.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entry {
    Inline {
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Link {
        link_id: CanonicalId,
        token: SecretText,
        expires_at: DateTime<Utc>,
    },
}

// ============================================================================
// DATA FLOW SERVICE
// ============================================================================

#[derive(Clone)]
pub struct DataFlowService {
    data_flow_repository: Arc<dyn DataFlowRepository>,
    messaging_queue: Arc<dyn MessagingQueue>,
    consent_repository: Arc<dyn ConsentRepository>,
    health_information_repository: Arc<dyn HealthInformationRepository>,
    cfg: Arc<DataFlowConfig>,
}

impl DataFlowService {
    pub fn new(
        data_flow_repository: Arc<dyn DataFlowRepository>,
        messaging_queue: Arc<dyn MessagingQueue>,
        consent_repository: Arc<dyn ConsentRepository>,
        health_information_repository: Arc<dyn HealthInformationRepository>,
        cfg: Arc<DataFlowConfig>,
    ) -> Self {
        Self {
            data_flow_repository,
            messaging_queue,
            consent_repository,
            health_information_repository,
            cfg,
        }
    }

    /// Accepts a request for health information under an existing, granted consent.
    ///
    /// On success the request is stored under its transaction id and a [`DataFlowMessage`]
    /// has been published for collection. If the publish fails the stored request is removed
    /// again, so the same transaction id can be resubmitted.
    ///
    /// # Errors
    ///
    /// - `ConsentNotFound` if no consent exists for `request.consent.id`
    /// - `ConsentNotGranted` if the consent was revoked or has expired
    /// - `ServerInternalError` if the consent lookup, the save, or the publish fails
    pub async fn health_information_request_for(
        &self,
        request: HealthInformationRequest,
    ) -> Result<HealthInformationResponse, ErrorRepresentation> {
        let consent = self
            .consent_repository
            .get_for(request.consent.id.as_str())
            .await
            .map_err(|e| {
                tracing::error!("Consent lookup error for {}: {:?}", request.consent.id, e);
                ErrorRepresentation::from(ErrorCode::ServerInternalError)
            })?;

        let consent = match consent {
            Some(consent) => consent,
            None => {
                tracing::warn!("no consent artefact found for {}", request.consent.id);
                return Err(ErrorCode::ConsentNotFound.into());
            }
        };
        if !consent.is_granted() {
            tracing::warn!(
                "consent artefact {} is {}, refusing transaction {}",
                consent.consent_artefact_id,
                consent.status,
                request.transaction_id
            );
            return Err(ErrorCode::ConsentNotGranted.into());
        }

        if let Err(e) = self
            .data_flow_repository
            .save_request(&request.transaction_id, &request)
            .await
        {
            tracing::error!(
                "Save health information request error for {}: {:?}",
                request.transaction_id,
                e
            );
            return Err(ErrorCode::ServerInternalError.into());
        }

        if let Err(e) = self.messaging_queue.publish(request.to_message()).await {
            tracing::error!(
                "Publish data flow request error for {}: {:?}",
                request.transaction_id,
                e
            );
            // Unqueued requests must not hold their transaction id.
            if let Err(e) = self
                .data_flow_repository
                .remove_request(&request.transaction_id)
                .await
            {
                tracing::error!(
                    "Remove unpublished request error for {}: {:?}",
                    request.transaction_id,
                    e
                );
            }
            return Err(ErrorCode::ServerInternalError.into());
        }

        tracing::debug!("accepted health information request {}", request.transaction_id);
        Ok(HealthInformationResponse::acknowledged(request.transaction_id))
    }

    /// Resolves the payload parked under `link_id`.
    ///
    /// # Errors
    ///
    /// - `HealthInformationNotFound` if nothing is stored under `link_id`
    /// - `InvalidToken` if `token` does not match the stored token
    /// - `LinkExpired` if the link's TTL has elapsed
    /// - `ServerInternalError` if the lookup itself fails
    pub async fn health_information_for(
        &self,
        link_id: &str,
        token: &str,
        transaction_id: &NonEmptyText,
    ) -> Result<HealthInformationResponse, ErrorRepresentation> {
        self.resolve_health_information(link_id, token, transaction_id, Utc::now())
            .await
    }

    async fn resolve_health_information(
        &self,
        link_id: &str,
        token: &str,
        transaction_id: &NonEmptyText,
        now: DateTime<Utc>,
    ) -> Result<HealthInformationResponse, ErrorRepresentation> {
        let information = self
            .health_information_repository
            .get(link_id)
            .await
            .map_err(|e| {
                tracing::error!("Health information lookup error for {}: {:?}", link_id, e);
                ErrorRepresentation::from(ErrorCode::ServerInternalError)
            })?
            .ok_or_else(|| {
                tracing::warn!("no health information under link {}", link_id);
                ErrorRepresentation::from(ErrorCode::HealthInformationNotFound)
            })?;

        if !information.token.matches(token) {
            tracing::warn!("invalid token presented for link {}", link_id);
            return Err(ErrorCode::InvalidToken.into());
        }

        if information.is_expired(self.cfg.data_link_ttl(), now) {
            tracing::warn!(
                "link {} expired at {}",
                link_id,
                information.expires_at(self.cfg.data_link_ttl())
            );
            return Err(ErrorCode::LinkExpired.into());
        }

        Ok(HealthInformationResponse::with_data(
            transaction_id.clone(),
            information.data,
        ))
    }

    /// Packages `content` for push, parking it behind a link when it exceeds the size limit.
    ///
    /// # Errors
    ///
    /// `ServerInternalError` if a link-bound payload cannot be stored.
    pub async fn entry_for(&self, content: String) -> Result<Entry, ErrorRepresentation> {
        let size = content.len() as u64;
        if size <= self.cfg.data_size_limit_in_bytes() {
            return Ok(Entry::Inline { content });
        }

        let link_id = CanonicalId::new();
        let token = CanonicalId::new().to_string();
        let created_at = Utc::now();

        let information = HealthInformation {
            link_id: NonEmptyText::new(link_id.to_string())
                .map_err(|_| ErrorRepresentation::from(ErrorCode::ServerInternalError))?,
            token: SecretText::new(token)
                .map_err(|_| ErrorRepresentation::from(ErrorCode::ServerInternalError))?,
            data: content,
            created_at,
        };
        let token = information.token.clone();
        let expires_at = information.expires_at(self.cfg.data_link_ttl());

        self.health_information_repository
            .add(information)
            .await
            .map_err(|e| {
                tracing::error!("Store health information error for {}: {:?}", link_id, e);
                ErrorRepresentation::from(ErrorCode::ServerInternalError)
            })?;

        tracing::debug!(
            "payload of {} bytes exceeds {} MB, parked under link {}",
            size,
            self.cfg.data_size_limit_in_mbs(),
            link_id
        );
        Ok(Entry::Link {
            link_id,
            token,
            expires_at,
        })
    }
}
