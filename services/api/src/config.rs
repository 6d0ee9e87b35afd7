use config::ConfigError;
use serde::Deserialize;
use shared::config::BrokerConfig;

#[derive(Debug, Deserialize)]
struct RawApiConfig {
    port: u16,
    postgres_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,
    pub postgres_uri: String,
    pub broker: BrokerConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&shared::config::load_env()?)
    }

    pub fn from_source(source: &config::Config) -> Result<Self, ConfigError> {
        let raw: RawApiConfig = source.clone().try_deserialize()?;

        Ok(Self {
            port: raw.port,
            postgres_uri: raw.postgres_uri,
            broker: BrokerConfig::from_source(source)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_from_strings() {
        let source = config::Config::builder()
            .set_override("port", "8080")
            .unwrap()
            .set_override("postgres_uri", "postgres://localhost/skills")
            .unwrap()
            .set_override("broker_url", "nats://localhost:4222")
            .unwrap()
            .set_override("skill_topic", "skills.commands")
            .unwrap()
            .build()
            .unwrap();

        let config = ApiConfig::from_source(&source).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.broker.skill_topic, "skills.commands");
    }

    #[test]
    fn test_api_config_requires_port() {
        let source = config::Config::builder()
            .set_override("postgres_uri", "postgres://localhost/skills")
            .unwrap()
            .build()
            .unwrap();

        let err = ApiConfig::from_source(&source).unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
