//! Broker abstraction
//!
//! The producer side only needs to hand bytes to a topic. The consumer side
//! reads one partition sequentially and advances its cursor explicitly.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("attach to topic {topic} failed: {reason}")]
    Attach { topic: String, reason: String },
    #[error("publish to {topic} rejected: {reason}")]
    Publish { topic: String, reason: String },
    #[error("publish to {topic} timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("commit of offset {offset} failed: {reason}")]
    Commit { offset: u64, reason: String },
    #[error("release failed: {0}")]
    Release(String),
}

/// One message pulled from a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: String,
    pub offset: u64,
    pub payload: Bytes,
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Enqueues exactly one message, returning once the broker acknowledged it.
    async fn send(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait PartitionSource: Send {
    /// Waits for the next message. `None` means the partition was closed.
    async fn recv(&mut self) -> Option<Result<Delivery, BrokerError>>;

    /// Marks `delivery` as consumed so it is not delivered again.
    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError>;

    /// Releases the partition cursor. No further `recv` is issued afterwards.
    async fn close_partition(&mut self) -> Result<(), BrokerError>;

    /// Releases the broker connection.
    async fn close(&mut self) -> Result<(), BrokerError>;
}

#[cfg(any(test, feature = "test-util"))]
pub use memory::{InMemoryBroker, InMemoryPartition};

#[cfg(any(test, feature = "test-util"))]
mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Topics {
        next_offset: HashMap<String, u64>,
        subscribers: HashMap<String, mpsc::UnboundedSender<Delivery>>,
        committed: Vec<u64>,
        released: Vec<&'static str>,
    }

    /// Single-partition broker kept in process memory.
    #[derive(Clone, Default)]
    pub struct InMemoryBroker {
        inner: Arc<Mutex<Topics>>,
    }

    impl InMemoryBroker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Attaches to `topic`. Only messages sent after attaching are delivered.
        pub fn partition(&self, topic: &str) -> InMemoryPartition {
            let (tx, rx) = mpsc::unbounded_channel();
            self.lock().subscribers.insert(topic.to_string(), tx);
            InMemoryPartition {
                broker: self.clone(),
                rx: Some(rx),
            }
        }

        /// Sends raw bytes without going through a publisher.
        pub fn inject(&self, topic: &str, payload: impl Into<Bytes>) -> u64 {
            let mut inner = self.lock();
            let offset = {
                let next = inner.next_offset.entry(topic.to_string()).or_insert(0);
                let offset = *next;
                *next += 1;
                offset
            };

            if let Some(tx) = inner.subscribers.get(topic) {
                let _ = tx.send(Delivery {
                    topic: topic.to_string(),
                    partition: "0".to_string(),
                    offset,
                    payload: payload.into(),
                });
            }
            offset
        }

        /// Drops the subscriber so the partition reports end of stream once drained.
        pub fn shutdown(&self, topic: &str) {
            self.lock().subscribers.remove(topic);
        }

        pub fn committed(&self) -> Vec<u64> {
            self.lock().committed.clone()
        }

        /// Release calls in the order they happened.
        pub fn released(&self) -> Vec<&'static str> {
            self.lock().released.clone()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Topics> {
            self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }

    #[async_trait]
    impl MessageSink for InMemoryBroker {
        async fn send(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
            self.inject(topic, payload);
            Ok(())
        }
    }

    pub struct InMemoryPartition {
        broker: InMemoryBroker,
        rx: Option<mpsc::UnboundedReceiver<Delivery>>,
    }

    #[async_trait]
    impl PartitionSource for InMemoryPartition {
        async fn recv(&mut self) -> Option<Result<Delivery, BrokerError>> {
            self.rx.as_mut()?.recv().await.map(Ok)
        }

        async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError> {
            self.broker.lock().committed.push(delivery.offset);
            Ok(())
        }

        async fn close_partition(&mut self) -> Result<(), BrokerError> {
            self.rx = None;
            self.broker.lock().released.push("partition");
            Ok(())
        }

        async fn close(&mut self) -> Result<(), BrokerError> {
            self.broker.lock().released.push("connection");
            Ok(())
        }
    }
}
