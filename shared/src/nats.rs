//! NATS JetStream binding for the broker traits.
//!
//! The configured topic is a JetStream subject captured by a single stream;
//! that stream is the partition the consumer reads. Stream sequences serve as
//! offsets.

use async_nats::jetstream::{self, consumer, stream};
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;

use crate::broker::{BrokerError, Delivery, MessageSink, PartitionSource};
use crate::config::{BrokerConfig, StartPolicy};

pub struct NatsClient {
    client: Client,
    jetstream: jetstream::Context,
    publish_timeout: Duration,
}

impl NatsClient {
    pub async fn connect(config: &BrokerConfig, name: &str) -> Result<Self, BrokerError> {
        let client = ConnectOptions::new()
            .name(name)
            .event_callback(|event| async move {
                match event {
                    async_nats::Event::Disconnected => tracing::warn!("NATS disconnected"),
                    async_nats::Event::Connected => tracing::info!("NATS connected"),
                    other => tracing::debug!(event = %other, "NATS event"),
                }
            })
            .connect(config.broker_url.as_str())
            .await
            .map_err(|e| BrokerError::Connect {
                url: config.broker_url.clone(),
                reason: e.to_string(),
            })?;

        let jetstream = jetstream::new(client.clone());

        Ok(Self {
            client,
            jetstream,
            publish_timeout: config.publish_timeout(),
        })
    }

    /// Creates the stream backing `topic` unless it already exists.
    pub async fn ensure_stream(&self, stream_name: &str, topic: &str) -> Result<stream::Stream, BrokerError> {
        self.jetstream
            .get_or_create_stream(stream::Config {
                name: stream_name.to_string(),
                subjects: vec![topic.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|e| BrokerError::Attach {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    /// Attaches a durable pull consumer to the stream and starts pulling.
    pub async fn partition(
        self,
        config: &BrokerConfig,
        consumer_name: &str,
        start: StartPolicy,
    ) -> Result<NatsPartition, BrokerError> {
        let topic = config.skill_topic.clone();
        let attach_err = |reason: String| BrokerError::Attach {
            topic: topic.clone(),
            reason,
        };

        let stream = self.ensure_stream(&config.skill_stream, &topic).await?;

        let deliver_policy = match start {
            StartPolicy::Newest => consumer::DeliverPolicy::New,
            StartPolicy::Earliest => consumer::DeliverPolicy::All,
            StartPolicy::Offset(start_sequence) => consumer::DeliverPolicy::ByStartSequence { start_sequence },
        };

        let pull = stream
            .get_or_create_consumer(
                consumer_name,
                consumer::pull::Config {
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: topic.clone(),
                    deliver_policy,
                    ack_policy: consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| attach_err(e.to_string()))?;

        let messages = pull
            .messages()
            .await
            .map_err(|e| attach_err(e.to_string()))?;

        tracing::info!(
            topic = %topic,
            partition = %config.skill_stream,
            consumer = %consumer_name,
            "Attached to partition"
        );

        Ok(NatsPartition {
            client: Some(self),
            messages: Some(messages),
            in_flight: None,
            topic,
            partition: config.skill_stream.clone(),
        })
    }

    /// Flushes pending writes and drops the connection.
    pub async fn close(self) -> Result<(), BrokerError> {
        self.client
            .flush()
            .await
            .map_err(|e| BrokerError::Release(e.to_string()))
    }
}

#[async_trait]
impl MessageSink for NatsClient {
    async fn send(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
        let timeout_ms = self.publish_timeout.as_millis() as u64;
        let publish_err = |reason: String| BrokerError::Publish {
            topic: topic.to_string(),
            reason,
        };

        tracing::debug!(subject = %topic, payload_size = payload.len(), "Publishing message");

        let ack = tokio::time::timeout(self.publish_timeout, async {
            let pending = self
                .jetstream
                .publish(topic.to_string(), payload)
                .await
                .map_err(|e| publish_err(e.to_string()))?;
            pending.await.map_err(|e| publish_err(e.to_string()))
        })
        .await
        .map_err(|_| BrokerError::Timeout {
            topic: topic.to_string(),
            timeout_ms,
        })??;

        tracing::debug!(subject = %topic, stream = %ack.stream, sequence = ack.sequence, "Publish acknowledged");

        Ok(())
    }
}

pub struct NatsPartition {
    client: Option<NatsClient>,
    messages: Option<consumer::pull::Stream>,
    in_flight: Option<jetstream::Message>,
    topic: String,
    partition: String,
}

#[async_trait]
impl PartitionSource for NatsPartition {
    async fn recv(&mut self) -> Option<Result<Delivery, BrokerError>> {
        let next = self.messages.as_mut()?.next().await?;

        let message = match next {
            Ok(message) => message,
            Err(e) => return Some(Err(BrokerError::Receive(e.to_string()))),
        };

        let offset = match message.info() {
            Ok(info) => info.stream_sequence,
            Err(e) => return Some(Err(BrokerError::Receive(e.to_string()))),
        };

        let delivery = Delivery {
            topic: self.topic.clone(),
            partition: self.partition.clone(),
            offset,
            payload: message.payload.clone(),
        };
        self.in_flight = Some(message);

        Some(Ok(delivery))
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError> {
        let Some(message) = self.in_flight.take() else {
            return Ok(());
        };

        message.ack().await.map_err(|e| BrokerError::Commit {
            offset: delivery.offset,
            reason: e.to_string(),
        })
    }

    async fn close_partition(&mut self) -> Result<(), BrokerError> {
        self.in_flight = None;
        self.messages = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        match self.client.take() {
            Some(client) => client.close().await,
            None => Ok(()),
        }
    }
}
