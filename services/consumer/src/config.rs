use config::ConfigError;
use serde::Deserialize;
use shared::config::{BrokerConfig, StartPolicy};

fn default_consumer_name() -> String {
    "skill-consumer".to_string()
}

#[derive(Debug, Deserialize)]
struct RawConsumerConfig {
    postgres_uri: String,
    #[serde(default = "default_consumer_name")]
    consumer_name: String,
    #[serde(default)]
    start_offset: String,
}

/// Everything the consumer loop and its collaborators need, resolved once at
/// startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub postgres_uri: String,
    pub consumer_name: String,
    pub start: StartPolicy,
    pub broker: BrokerConfig,
}

impl ConsumerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&shared::config::load_env()?)
    }

    pub fn from_source(source: &config::Config) -> Result<Self, ConfigError> {
        let raw: RawConsumerConfig = source.clone().try_deserialize()?;

        Ok(Self {
            postgres_uri: raw.postgres_uri,
            consumer_name: raw.consumer_name,
            start: raw.start_offset.parse()?,
            broker: BrokerConfig::from_source(source)?,
        })
    }

    pub fn topic(&self) -> &str {
        &self.broker.skill_topic
    }
}
