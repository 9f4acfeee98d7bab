//! Hand-off from the data-flow service to the collection pipeline.
//!
//! Once a health-information request has been stored, a [`DataFlowMessage`] is published so
//! that data collection can start without blocking the caller. The shipped queue is an
//! in-process bounded `tokio` channel.

use crate::data_flow::{DateRange, KeyMaterial};
use crate::error::MessagingError;
use async_trait::async_trait;
use hip_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// What the collection pipeline needs to gather and push data for one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowMessage {
    pub transaction_id: NonEmptyText,
    pub consent_id: NonEmptyText,
    pub hi_data_range: DateRange,
    pub data_push_url: String,
    pub key_material: KeyMaterial,
}

#[async_trait]
pub trait MessagingQueue: Send + Sync {
    async fn publish(&self, message: DataFlowMessage) -> Result<(), MessagingError>;
}

/// [`MessagingQueue`] backed by a bounded `tokio::sync::mpsc` channel.
#[derive(Clone, Debug)]
pub struct ChannelQueue {
    sender: mpsc::Sender<DataFlowMessage>,
}

impl ChannelQueue {
    /// Creates the queue together with the receiving end for the collection side.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DataFlowMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessagingQueue for ChannelQueue {
    async fn publish(&self, message: DataFlowMessage) -> Result<(), MessagingError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| MessagingError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_flow::tests::sample_request;

    fn message() -> DataFlowMessage {
        let request = sample_request("tx-1", "consent-1");
        DataFlowMessage {
            transaction_id: request.transaction_id,
            consent_id: request.consent.id,
            hi_data_range: request.hi_data_range,
            data_push_url: request.data_push_url,
            key_material: request.key_material,
        }
    }

    #[tokio::test]
    async fn test_published_message_is_received() {
        let (queue, mut receiver) = ChannelQueue::new(4);

        queue.publish(message()).await.expect("publish should succeed");

        let received = receiver.recv().await.expect("message should be delivered");
        assert_eq!(received.transaction_id.as_str(), "tx-1");
    }

    #[tokio::test]
    async fn test_publish_fails_once_receiver_is_dropped() {
        let (queue, receiver) = ChannelQueue::new(1);
        drop(receiver);

        let err = queue
            .publish(message())
            .await
            .expect_err("publishing into a closed queue should fail");
        assert!(matches!(err, MessagingError::Closed));
    }
}
