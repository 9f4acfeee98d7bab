//! Discovery request persistence.

use crate::discovery::DiscoveryRequest;
use crate::error::StoreResult;
use async_trait::async_trait;
use hip_types::NonEmptyText;

#[async_trait]
pub trait DiscoveryRequestRepository: Send + Sync {
    /// Inserts `request` and commits.
    ///
    /// # Errors
    ///
    /// Propagates any failure to write or commit.
    async fn add(&self, request: DiscoveryRequest) -> StoreResult<()>;

    /// Removes the record matching both identifiers and commits.
    ///
    /// The pair is unique by construction; if duplicates exist the first match is removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::error::StoreError::NotFound) if nothing matches.
    async fn delete(
        &self,
        transaction_id: &NonEmptyText,
        consent_manager_user_id: &NonEmptyText,
    ) -> StoreResult<()>;

    /// Whether a record matching both identifiers exists.
    async fn exists(
        &self,
        transaction_id: &NonEmptyText,
        consent_manager_user_id: &NonEmptyText,
    ) -> StoreResult<bool>;
}
