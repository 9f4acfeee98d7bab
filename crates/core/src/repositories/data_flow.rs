//! Health-information request persistence.

use crate::data_flow::HealthInformationRequest;
use crate::error::StoreResult;
use async_trait::async_trait;
use hip_types::NonEmptyText;

#[async_trait]
pub trait DataFlowRepository: Send + Sync {
    /// Stores `request` under `transaction_id`.
    ///
    /// # Errors
    ///
    /// Any failure, including a transaction id that was already used, is returned as a
    /// `StoreError`; the service reports it as an internal error.
    async fn save_request(
        &self,
        transaction_id: &NonEmptyText,
        request: &HealthInformationRequest,
    ) -> StoreResult<()>;

    /// Removes the request stored under `transaction_id`, freeing the id for a resubmission.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if nothing is stored under `transaction_id`.
    async fn remove_request(&self, transaction_id: &NonEmptyText) -> StoreResult<()>;
}
