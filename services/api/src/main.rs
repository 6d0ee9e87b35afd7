use anyhow::Context;
use api::{create_router, ApiConfig, AppState, CommandPublisher, PgSkillRepository};
use shared::NatsClient;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shared::logger::init_logger("skill-api");

    let config = ApiConfig::from_env().context("Invalid API configuration")?;

    let pool = shared::database::create_pool(&config.postgres_uri).await?;

    let client = NatsClient::connect(&config.broker, "skill-api")
        .await
        .context("Failed to connect to broker")?;
    client
        .ensure_stream(&config.broker.skill_stream, &config.broker.skill_topic)
        .await
        .context("Failed to prepare skill topic")?;
    let client = Arc::new(client);

    let publisher = CommandPublisher::new(client.clone(), config.broker.skill_topic.clone());
    let state = AppState::new(
        Arc::new(PgSkillRepository::new(pool.clone())),
        Arc::new(publisher),
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shared::shutdown::shutdown_signal())
        .await?;

    match Arc::into_inner(client) {
        Some(client) => client.close().await.context("Failed to close broker connection")?,
        None => tracing::warn!("Broker connection still shared at shutdown"),
    }
    pool.close().await;
    tracing::info!("Server shutdown successfully");

    Ok(())
}
