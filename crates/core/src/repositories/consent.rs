//! Consent lookup.

use crate::consent::Consent;
use crate::error::StoreResult;
use async_trait::async_trait;

#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// Returns the consent with the given artefact id, if any.
    async fn get_for(&self, consent_artefact_id: &str) -> StoreResult<Option<Consent>>;

    /// Stores a consent artefact, replacing one with the same id.
    async fn add(&self, consent: Consent) -> StoreResult<()>;
}
