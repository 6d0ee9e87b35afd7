//! Skill command publisher
//!
//! Serializes a command envelope and hands it to the broker topic. One attempt
//! per call: any error means the command was not accepted.

use async_trait::async_trait;
use bytes::Bytes;
use shared::broker::{BrokerError, MessageSink};
use shared::command::{SkillCommand, SkillRequest};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("serialize skill command: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SkillQueue: Send + Sync {
    /// Publishes `request` for `key`. `Ok` means exactly one message was enqueued.
    async fn publish(&self, key: Option<String>, request: SkillRequest) -> Result<(), PublishError>;
}

pub struct CommandPublisher {
    sink: Arc<dyn MessageSink>,
    topic: String,
}

impl CommandPublisher {
    pub fn new(sink: Arc<dyn MessageSink>, topic: impl Into<String>) -> Self {
        Self {
            sink,
            topic: topic.into(),
        }
    }

    pub async fn publish_command(&self, command: &SkillCommand) -> Result<(), PublishError> {
        let message = command.encode()?;
        self.sink.send(&self.topic, Bytes::from(message)).await?;

        tracing::info!(
            topic = %self.topic,
            action = %command.action,
            key = %command.key_or_placeholder(),
            "Skill command published"
        );
        Ok(())
    }
}

#[async_trait]
impl SkillQueue for CommandPublisher {
    async fn publish(&self, key: Option<String>, request: SkillRequest) -> Result<(), PublishError> {
        let command = SkillCommand::from_request(key, &request)?;
        self.publish_command(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::broker::{InMemoryBroker, PartitionSource};
    use shared::command::UpdateSkillNameRequest;

    struct RejectingSink;

    #[async_trait]
    impl MessageSink for RejectingSink {
        async fn send(&self, topic: &str, _payload: Bytes) -> Result<(), BrokerError> {
            Err(BrokerError::Timeout {
                topic: topic.to_string(),
                timeout_ms: 5000,
            })
        }
    }

    #[tokio::test]
    async fn test_publish_enqueues_single_envelope() {
        let broker = InMemoryBroker::new();
        let mut partition = broker.partition("skills");
        let publisher = CommandPublisher::new(Arc::new(broker.clone()), "skills");

        publisher
            .publish(
                Some("go".to_string()),
                SkillRequest::UpdateName(UpdateSkillNameRequest {
                    name: "Golang".to_string(),
                }),
            )
            .await
            .unwrap();
        broker.shutdown("skills");

        let delivery = partition.recv().await.unwrap().unwrap();
        let command = SkillCommand::decode(&delivery.payload).unwrap();
        assert_eq!(command.action, "update_name");
        assert_eq!(command.key(), Some("go"));
        assert!(partition.recv().await.is_none());
    }

    #[test]
    fn test_broker_failure_surfaces_to_caller() {
        let publisher = CommandPublisher::new(Arc::new(RejectingSink), "skills");

        let err = tokio_test::block_on(publisher.publish(Some("go".to_string()), SkillRequest::Delete))
            .unwrap_err();

        assert!(matches!(err, PublishError::Broker(BrokerError::Timeout { .. })));
    }
}
