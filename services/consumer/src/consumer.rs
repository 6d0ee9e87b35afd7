//! Consumer loop
//!
//! Pulls one partition sequentially: decode, validate, dispatch, log, commit.
//! A bad message is logged and skipped. The run ends on cancellation or when
//! the broker closes the partition.

use shared::broker::{BrokerError, Delivery, PartitionSource};
use shared::command::SkillCommand;
use tokio_util::sync::CancellationToken;

use crate::config::ConsumerConfig;
use crate::dispatcher::SkillDispatcher;
use crate::service::SkillService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Stopping,
    Terminal,
}

/// Per-run counters. Every received message lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub processed: u64,
    pub decode_failures: u64,
    pub validation_failures: u64,
    pub dispatch_failures: u64,
}

impl ConsumerStats {
    pub fn received(&self) -> u64 {
        self.processed + self.decode_failures + self.validation_failures + self.dispatch_failures
    }
}

enum Outcome {
    Processed,
    DecodeFailed,
    Invalid,
    DispatchFailed,
}

pub struct SkillConsumer<P, S> {
    config: ConsumerConfig,
    partition: P,
    dispatcher: SkillDispatcher<S>,
    state: ConsumerState,
    stats: ConsumerStats,
}

impl<P, S> SkillConsumer<P, S>
where
    P: PartitionSource,
    S: SkillService,
{
    pub fn new(config: ConsumerConfig, partition: P, dispatcher: SkillDispatcher<S>) -> Self {
        Self {
            config,
            partition,
            dispatcher,
            state: ConsumerState::Running,
            stats: ConsumerStats::default(),
        }
    }

    /// Runs until `shutdown` fires or the broker closes the partition, then
    /// releases the partition cursor and the connection, in that order.
    ///
    /// A message already being dispatched when `shutdown` fires is finished
    /// and committed before the loop stops. Failing to release resources is
    /// the only error returned.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<ConsumerStats, BrokerError> {
        tracing::info!(
            topic = %self.config.topic(),
            consumer = %self.config.consumer_name,
            start = %self.config.start,
            "Consuming topic"
        );

        while self.state == ConsumerState::Running {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    None
                }
                next = self.partition.recv() => match next {
                    Some(next) => Some(next),
                    None => {
                        tracing::warn!(topic = %self.config.topic(), "Partition closed by broker");
                        None
                    }
                },
            };

            match next {
                Some(Ok(delivery)) => self.process(delivery).await,
                Some(Err(e)) => {
                    tracing::error!(topic = %self.config.topic(), error = %e, "Receive failed");
                }
                None => self.transition(ConsumerState::Stopping),
            }
        }

        self.release().await?;
        Ok(self.stats)
    }

    async fn process(&mut self, delivery: Delivery) {
        tracing::debug!(
            topic = %delivery.topic,
            partition = %delivery.partition,
            offset = delivery.offset,
            "Consumed message"
        );

        match apply(&self.dispatcher, &delivery).await {
            Outcome::Processed => self.stats.processed += 1,
            Outcome::DecodeFailed => self.stats.decode_failures += 1,
            Outcome::Invalid => self.stats.validation_failures += 1,
            Outcome::DispatchFailed => self.stats.dispatch_failures += 1,
        }

        // The offset advances whatever the outcome; redelivery is the broker's business.
        if let Err(e) = self.partition.commit(&delivery).await {
            tracing::error!(
                topic = %delivery.topic,
                partition = %delivery.partition,
                offset = delivery.offset,
                error = %e,
                "Commit failed"
            );
        }
    }

    async fn release(&mut self) -> Result<(), BrokerError> {
        self.partition.close_partition().await?;
        tracing::info!(topic = %self.config.topic(), "Partition closed");

        self.partition.close().await?;
        tracing::info!("Broker connection closed");

        self.transition(ConsumerState::Terminal);
        tracing::info!(
            processed = self.stats.processed,
            decode_failures = self.stats.decode_failures,
            validation_failures = self.stats.validation_failures,
            dispatch_failures = self.stats.dispatch_failures,
            "Consumer stopped"
        );
        Ok(())
    }

    fn transition(&mut self, next: ConsumerState) {
        tracing::info!(from = ?self.state, to = ?next, "Consumer state change");
        self.state = next;
    }
}

async fn apply<S: SkillService>(dispatcher: &SkillDispatcher<S>, delivery: &Delivery) -> Outcome {
    let command = match SkillCommand::decode(&delivery.payload) {
        Ok(command) => command,
        Err(e) => {
            tracing::error!(
                topic = %delivery.topic,
                partition = %delivery.partition,
                offset = delivery.offset,
                error = %e,
                "Error decoding message"
            );
            return Outcome::DecodeFailed;
        }
    };

    if let Err(e) = command.validate() {
        tracing::error!(
            topic = %delivery.topic,
            partition = %delivery.partition,
            offset = delivery.offset,
            error = %e,
            "Invalid skill command"
        );
        return Outcome::Invalid;
    }

    match dispatcher.handle(&command).await {
        Ok(action) => {
            tracing::info!(
                action = %action,
                key = %command.key_or_placeholder(),
                offset = delivery.offset,
                "Skill command applied"
            );
            Outcome::Processed
        }
        Err(e) => {
            tracing::error!(
                action = %command.action,
                key = %command.key_or_placeholder(),
                offset = delivery.offset,
                error = %e,
                "Skill command failed"
            );
            Outcome::DispatchFailed
        }
    }
}
