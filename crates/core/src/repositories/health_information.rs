//! Health-information payload lookup.

use crate::error::StoreResult;
use crate::health_information::HealthInformation;
use async_trait::async_trait;

#[async_trait]
pub trait HealthInformationRepository: Send + Sync {
    /// Returns the payload stored under `link_id`, if any.
    async fn get(&self, link_id: &str) -> StoreResult<Option<HealthInformation>>;

    async fn add(&self, information: HealthInformation) -> StoreResult<()>;
}
