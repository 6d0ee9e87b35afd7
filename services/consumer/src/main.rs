use anyhow::Context;
use consumer::{ConsumerConfig, PgSkillStorage, SkillConsumer, SkillDispatcher, StorageSkillService};
use shared::NatsClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shared::logger::init_logger("skill-consumer");

    let config = ConsumerConfig::from_env().context("Invalid consumer configuration")?;

    let pool = shared::database::create_pool(&config.postgres_uri).await?;
    let storage = PgSkillStorage::new(pool.clone());
    storage.ensure_schema().await.context("Failed to prepare skill table")?;

    let service = StorageSkillService::new(Arc::new(storage));
    let dispatcher = SkillDispatcher::new(service);

    let client = NatsClient::connect(&config.broker, &config.consumer_name)
        .await
        .context("Failed to connect to broker")?;
    let partition = client
        .partition(&config.broker, &config.consumer_name, config.start)
        .await
        .context("Failed to attach to skill topic")?;

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        shared::shutdown::shutdown_signal().await;
        token.cancel();
    });

    let stats = SkillConsumer::new(config, partition, dispatcher)
        .run(shutdown)
        .await
        .context("Failed to release broker resources")?;

    pool.close().await;
    tracing::info!(received = stats.received(), "Database connection closed");

    Ok(())
}
